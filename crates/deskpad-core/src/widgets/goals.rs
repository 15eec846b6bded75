use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{check_box, percent, short_id};
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Frame};

pub const PROGRESS_REGION: &str = "goalsProgress";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub date: NaiveDate,
}

fn render_goal(goal: &Record<Goal>) -> String {
    format!(
        "{} {} {}",
        short_id(goal.id()),
        check_box(goal.data.completed),
        goal.data.text
    )
}

/// Daily goals with a completion bar.
#[derive(Debug)]
pub struct Goals {
    list: ListManager<Goal>,
}

impl Goals {
    pub fn new(services: Services) -> Self {
        let list = ListManager::new(StoreKey::Goals, services)
            .empty_message("No goals yet. Add one to get started! 🎯")
            .render_with(render_goal);
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Goal> {
        &self.list
    }

    #[instrument(skip(self))]
    pub fn add(&mut self, text: &str) -> WidgetResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return self.list.services().reject(ValidationError::EmptyGoal);
        }
        let date = self.list.services().clock.today();
        let id = self.list.add(Goal {
            text: text.to_string(),
            completed: false,
            date,
        });
        self.render_progress();
        Ok(id)
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        let changed = self.list.update(id, |goal| goal.completed = !goal.completed);
        if changed {
            self.render_progress();
        }
        changed
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        let removed = self.list.delete(id, confirmed);
        if removed {
            self.render_progress();
        }
        removed
    }

    pub fn progress_percent(&self) -> u32 {
        let done = self.list.items().iter().filter(|g| g.data.completed).count();
        percent(done, self.list.len())
    }

    pub fn render(&self) -> Frame {
        self.render_progress();
        self.list.render()
    }

    fn render_progress(&self) {
        let frame = Frame::Lines(vec![format!("{}%", self.progress_percent())]);
        self.list.services().view.draw(PROGRESS_REGION, &frame);
    }
}

#[cfg(test)]
mod tests {
    use super::Goals;
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::surface::Frame;

    #[test]
    fn progress_follows_toggles() {
        let h = Harness::new();
        let mut goals = Goals::new(h.services.clone());
        assert_eq!(goals.progress_percent(), 0);

        let first = goals.add("Run 5k").expect("added");
        goals.add("Read").expect("added");
        goals.add("Stretch").expect("added");
        assert!(goals.toggle(&first));

        assert_eq!(goals.progress_percent(), 33);
        assert_eq!(
            h.view.frame("goalsProgress"),
            Some(Frame::Lines(vec!["33%".to_string()]))
        );
        assert_eq!(
            goals.list().get(&first).map(|g| g.data.date.to_string()),
            Some("2026-10-17".to_string())
        );
    }

    #[test]
    fn blank_goal_is_rejected() {
        let h = Harness::new();
        let mut goals = Goals::new(h.services.clone());
        assert_eq!(goals.add("\t"), Err(ValidationError::EmptyGoal));
        assert_eq!(h.last_message().as_deref(), Some("Please enter a goal"));
    }
}
