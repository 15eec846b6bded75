use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::percent;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::events::Event;
use crate::store::StoreKey;
use crate::surface::{Frame, Level};

pub const DEFAULT_DAILY_GOAL: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterIntake {
    pub cups: u32,
    pub daily_goal: u32,
    pub last_reset: NaiveDate,
}

/// Cups of water drunk today against a daily goal. The count starts over on
/// the first use of each new day; missed days are not carried.
#[derive(Debug)]
pub struct Water {
    services: Services,
    state: WaterIntake,
}

impl Water {
    pub fn new(services: Services, default_goal: u32) -> Self {
        let fresh = WaterIntake {
            cups: 0,
            daily_goal: default_goal.max(1),
            last_reset: services.clock.today(),
        };
        let state = services.store.load(StoreKey::WaterIntake, fresh);
        let mut water = Self { services, state };
        water.init();
        water
    }

    /// Starts the count over when the stored day is not today.
    #[instrument(skip(self))]
    pub fn init(&mut self) -> bool {
        let today = self.services.clock.today();
        if self.state.last_reset == today {
            return false;
        }
        debug!(last_reset = %self.state.last_reset, %today, "new day, resetting water intake");
        self.state.cups = 0;
        self.state.last_reset = today;
        self.commit();
        true
    }

    pub fn state(&self) -> &WaterIntake {
        &self.state
    }

    /// Adds one cup. At the goal nothing changes and `false` comes back.
    pub fn add_cup(&mut self) -> bool {
        if self.state.cups >= self.state.daily_goal {
            return false;
        }
        self.state.cups += 1;
        self.commit();

        if self.state.cups == self.state.daily_goal {
            info!(cups = self.state.cups, "water goal reached");
            self.services.notify(
                Level::Success,
                "Great! You've reached your daily water goal! 💧",
            );
            self.services.bus.publish(&Event::WaterGoalReached {
                cups: self.state.cups,
            });
        }
        true
    }

    pub fn reset(&mut self) {
        self.state.cups = 0;
        self.commit();
    }

    pub fn set_goal(&mut self, goal: i64) -> WidgetResult<()> {
        let Ok(goal) = u32::try_from(goal) else {
            return self.services.reject(ValidationError::InvalidWaterGoal);
        };
        if goal == 0 {
            return self.services.reject(ValidationError::InvalidWaterGoal);
        }
        self.state.daily_goal = goal;
        self.state.cups = self.state.cups.min(goal);
        self.commit();
        Ok(())
    }

    pub fn percentage(&self) -> u32 {
        percent(self.state.cups as usize, self.state.daily_goal as usize)
    }

    pub fn persist(&self) {
        self.services.store.save(StoreKey::WaterIntake, &self.state);
    }

    pub fn render(&self) -> Frame {
        let frame = Frame::Lines(vec![format!(
            "{} / {} cups ({}%)",
            self.state.cups,
            self.state.daily_goal,
            self.percentage()
        )]);
        self.services
            .view
            .draw(StoreKey::WaterIntake.as_str(), &frame);
        frame
    }

    fn commit(&self) {
        self.persist();
        self.render();
        self.services.changed(StoreKey::WaterIntake);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::NaiveDate;

    use super::{Water, WaterIntake};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::events::Event;
    use crate::store::StoreKey;

    #[test]
    fn new_day_resets_cups() {
        let h = Harness::new();
        let yesterday = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        h.services.store.save(
            StoreKey::WaterIntake,
            &WaterIntake {
                cups: 8,
                daily_goal: 8,
                last_reset: yesterday,
            },
        );

        let water = Water::new(h.services.clone(), 8);

        assert_eq!(water.state().cups, 0);
        assert_eq!(
            water.state().last_reset,
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
        let saved: Option<WaterIntake> = h.services.store.load(StoreKey::WaterIntake, None);
        assert_eq!(saved.map(|s| s.cups), Some(0));
    }

    #[test]
    fn same_day_keeps_cups() {
        let h = Harness::new();
        let mut water = Water::new(h.services.clone(), 8);
        water.add_cup();
        water.add_cup();

        let reloaded = Water::new(h.services.clone(), 8);
        assert_eq!(reloaded.state().cups, 2);
    }

    #[test]
    fn cups_stop_at_goal_and_goal_is_announced_once() {
        let h = Harness::new();
        let reached = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&reached);
        h.services.bus.subscribe(move |event| {
            if let Event::WaterGoalReached { cups } = event {
                seen.borrow_mut().push(*cups);
            }
            Ok(())
        });

        let mut water = Water::new(h.services.clone(), 2);
        assert!(water.add_cup());
        assert!(water.add_cup());
        assert!(!water.add_cup());

        assert_eq!(water.state().cups, 2);
        assert_eq!(water.percentage(), 100);
        assert_eq!(*reached.borrow(), vec![2]);
        assert_eq!(
            h.last_message().as_deref(),
            Some("Great! You've reached your daily water goal! 💧")
        );
    }

    #[test]
    fn goal_changes_are_validated_and_clamp_cups() {
        let h = Harness::new();
        let mut water = Water::new(h.services.clone(), 8);
        for _ in 0..5 {
            water.add_cup();
        }

        assert_eq!(water.set_goal(0), Err(ValidationError::InvalidWaterGoal));
        assert_eq!(water.set_goal(-3), Err(ValidationError::InvalidWaterGoal));
        assert_eq!(water.set_goal(3), Ok(()));
        assert_eq!(water.state().cups, 3);

        water.reset();
        assert_eq!(water.state().cups, 0);
        assert_eq!(water.percentage(), 0);
    }
}
