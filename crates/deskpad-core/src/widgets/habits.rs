use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::short_id;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::Confirmed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub name: String,
    /// Check-ins so far; the statistics treat it as the streak length.
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug)]
pub struct Habits {
    list: ListManager<Habit>,
}

impl Habits {
    pub fn new(services: Services) -> Self {
        let list = ListManager::new(StoreKey::Habits, services)
            .empty_message("No habits yet. Add one to get started!")
            .render_with(|habit: &Record<Habit>| {
                format!(
                    "{} {} ({} check-ins)",
                    short_id(habit.id()),
                    habit.data.name,
                    habit.data.count
                )
            });
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Habit> {
        &self.list
    }

    pub(crate) fn list_mut(&mut self) -> &mut ListManager<Habit> {
        &mut self.list
    }

    #[instrument(skip(self))]
    pub fn add(&mut self, name: &str) -> WidgetResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return self.list.services().reject(ValidationError::EmptyHabit);
        }
        Ok(self.list.add(Habit {
            name: name.to_string(),
            count: 0,
        }))
    }

    pub fn check_in(&mut self, id: &str) -> bool {
        self.list
            .update(id, |habit| habit.count = habit.count.saturating_add(1))
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }
}
