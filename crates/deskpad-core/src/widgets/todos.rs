use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{check_box, short_id};
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::Confirmed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(ValidationError::UnknownPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
}

pub const FILTERS: [&str; 3] = ["all", "active", "completed"];

fn filter_todos<'a>(items: &'a [Record<Todo>], filter: &str) -> Vec<&'a Record<Todo>> {
    match filter {
        "active" => items.iter().filter(|t| !t.data.completed).collect(),
        "completed" => items.iter().filter(|t| t.data.completed).collect(),
        _ => items.iter().collect(),
    }
}

fn render_todo(todo: &Record<Todo>) -> String {
    format!(
        "{} {} {} ({})",
        short_id(todo.id()),
        check_box(todo.data.completed),
        todo.data.text,
        todo.data.priority
    )
}

#[derive(Debug)]
pub struct Todos {
    list: ListManager<Todo>,
}

impl Todos {
    pub fn new(services: Services) -> Self {
        let list = ListManager::new(StoreKey::Todos, services)
            .empty_message("No tasks yet. Add one to get started!")
            .filter_with(filter_todos)
            .render_with(render_todo);
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Todo> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListManager<Todo> {
        &mut self.list
    }

    #[instrument(skip(self))]
    pub fn add(&mut self, text: &str, priority: Priority) -> WidgetResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return self.list.services().reject(ValidationError::EmptyTask);
        }
        Ok(self.list.add(Todo {
            text: text.to_string(),
            completed: false,
            priority,
        }))
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        self.list.update(id, |todo| todo.completed = !todo.completed)
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }

    pub fn completed_count(&self) -> usize {
        self.list.items().iter().filter(|t| t.data.completed).count()
    }

    pub fn summary(&self) -> String {
        format!("{} of {} completed", self.completed_count(), self.list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Todos};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::surface::Frame;

    #[test]
    fn blank_text_is_rejected_and_reported() {
        let h = Harness::new();
        let mut todos = Todos::new(h.services.clone());

        assert_eq!(todos.add("   ", Priority::High), Err(ValidationError::EmptyTask));
        assert!(todos.list().is_empty());
        assert_eq!(h.last_message().as_deref(), Some("Please enter a task"));
    }

    #[test]
    fn toggle_flips_completion_and_filters_follow() {
        let h = Harness::new();
        let mut todos = Todos::new(h.services.clone());
        let first = todos.add("Write spec", Priority::High).expect("added");
        todos.add("Review", Priority::Low).expect("added");

        assert!(todos.toggle(&first));
        assert_eq!(todos.summary(), "1 of 2 completed");

        let frame = todos.list_mut().set_filter("active");
        assert_eq!(frame.lines().len(), 1);
        assert!(frame.lines()[0].ends_with("[ ] Review (low)"));

        let frame = todos.list_mut().set_filter("completed");
        assert!(frame.lines()[0].ends_with("[x] Write spec (high)"));
    }

    #[test]
    fn empty_list_shows_message() {
        let h = Harness::new();
        let todos = Todos::new(h.services.clone());
        assert_eq!(
            todos.list().render(),
            Frame::Empty("No tasks yet. Add one to get started!".to_string())
        );
    }

    #[test]
    fn priority_parsing() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("m".parse::<Priority>(), Ok(Priority::Medium));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
