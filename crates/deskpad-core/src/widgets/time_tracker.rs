use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::short_id;
use crate::clock::{Interval, format_hms};
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{InsertAt, ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Frame};

pub const TIMER_REGION: &str = "timer";
const SHOWN_ACTIVITIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    /// Whole seconds.
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningActivity {
    pub name: String,
    pub started_at: DateTime<Utc>,
}

pub fn format_duration(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

fn latest_first<'a>(items: &'a [Record<Activity>], _filter: &str) -> Vec<&'a Record<Activity>> {
    items.iter().take(SHOWN_ACTIVITIES).collect()
}

fn render_activity(activity: &Record<Activity>) -> String {
    format!(
        "{} {} {}",
        short_id(activity.id()),
        activity.data.name,
        format_duration(activity.data.duration)
    )
}

/// One running activity at a time, plus the log of finished ones.
#[derive(Debug)]
pub struct TimeTracker {
    list: ListManager<Activity>,
    running: Option<RunningActivity>,
    ticker: Interval,
}

impl TimeTracker {
    pub fn new(services: Services) -> Self {
        let running: Option<RunningActivity> =
            services.store.load(StoreKey::CurrentActivity, None);
        let mut ticker = Interval::every_second();
        if running.is_some() {
            ticker.start(services.clock.now());
        }
        let list = ListManager::new(StoreKey::TimeTracking, services)
            .empty_message("No activities tracked yet")
            .insert_at(InsertAt::Front)
            .filter_with(latest_first)
            .render_with(render_activity);
        Self {
            list,
            running,
            ticker,
        }
    }

    pub fn list(&self) -> &ListManager<Activity> {
        &self.list
    }

    pub fn running(&self) -> Option<&RunningActivity> {
        self.running.as_ref()
    }

    #[instrument(skip(self))]
    pub fn start(&mut self, name: &str) -> WidgetResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return self.list.services().reject(ValidationError::EmptyActivity);
        }
        if self.running.is_some() {
            return self.list.services().reject(ValidationError::ActivityRunning);
        }

        let now = self.list.services().clock.now();
        info!(activity = name, "activity started");
        self.running = Some(RunningActivity {
            name: name.to_string(),
            started_at: now,
        });
        self.ticker.start(now);
        self.persist_running();
        self.render();
        self.list.services().changed(StoreKey::CurrentActivity);
        Ok(())
    }

    /// Records the running activity. Returns the new record's id, or `None`
    /// when nothing was running.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Option<String> {
        let running = self.running.take()?;
        self.ticker.stop();
        let now = self.list.services().clock.now();
        let duration = (now - running.started_at).num_seconds().max(0) as u64;
        info!(activity = %running.name, duration, "activity stopped");

        self.persist_running();
        self.list.services().changed(StoreKey::CurrentActivity);
        let id = self.list.add(Activity {
            name: running.name,
            duration,
        });
        self.render_timer();
        Some(id)
    }

    /// Seconds since the running activity started.
    pub fn elapsed(&self) -> Option<u64> {
        let running = self.running.as_ref()?;
        let now = self.list.services().clock.now();
        Some((now - running.started_at).num_seconds().max(0) as u64)
    }

    pub fn elapsed_display(&self) -> String {
        format_hms(self.elapsed().unwrap_or(0))
    }

    /// Redraws the timer when at least one tick came due.
    pub fn poll(&mut self, now: DateTime<Utc>) -> u32 {
        let ticks = self.ticker.poll(now);
        if ticks > 0 {
            debug!(ticks, "activity timer tick");
            self.render_timer();
        }
        ticks
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }

    pub fn persist(&self) {
        self.list.persist();
        self.persist_running();
    }

    pub fn render(&self) -> Frame {
        self.render_timer();
        self.list.render()
    }

    fn persist_running(&self) {
        self.list
            .services()
            .store
            .save(StoreKey::CurrentActivity, &self.running);
    }

    fn render_timer(&self) {
        let frame = match &self.running {
            Some(running) => Frame::Lines(vec![running.name.clone(), self.elapsed_display()]),
            None => Frame::Lines(vec!["No activity".to_string(), format_hms(0)]),
        };
        self.list.services().view.draw(TIMER_REGION, &frame);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::{TimeTracker, format_duration};
    use crate::clock::Clock;
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::surface::Frame;

    #[test]
    fn stop_records_whole_seconds_newest_first() {
        let h = Harness::new();
        let mut tracker = TimeTracker::new(h.services.clone());

        tracker.start("Email").expect("started");
        h.clock.advance(Duration::milliseconds(90_700));
        tracker.stop().expect("recorded");
        tracker.start("Code review").expect("started");
        h.clock.advance(Duration::seconds(5));
        tracker.stop().expect("recorded");

        let items = tracker.list().items();
        assert_eq!(items[0].data.name, "Code review");
        assert_eq!(items[1].data.name, "Email");
        assert_eq!(items[1].data.duration, 90);
        assert!(tracker.running().is_none());
        assert_eq!(tracker.stop(), None);
    }

    #[test]
    fn only_one_activity_runs_at_a_time() {
        let h = Harness::new();
        let mut tracker = TimeTracker::new(h.services.clone());

        assert_eq!(tracker.start(" "), Err(ValidationError::EmptyActivity));
        tracker.start("Write").expect("started");
        assert_eq!(tracker.start("Read"), Err(ValidationError::ActivityRunning));
        assert_eq!(h.last_message().as_deref(), Some("Stop current activity first"));
    }

    #[test]
    fn running_activity_survives_reload_and_ticks() {
        let h = Harness::new();
        let mut tracker = TimeTracker::new(h.services.clone());
        tracker.start("Deep work").expect("started");

        h.clock.advance(Duration::seconds(3725));
        let mut reloaded = TimeTracker::new(h.services.clone());
        assert_eq!(reloaded.elapsed(), Some(3725));

        h.clock.advance(Duration::seconds(2));
        assert!(reloaded.poll(h.clock.now()) >= 1);
        assert_eq!(
            h.view.frame("timer"),
            Some(Frame::Lines(vec![
                "Deep work".to_string(),
                "01:02:07".to_string()
            ]))
        );
    }

    #[test]
    fn durations_read_as_minutes_and_seconds() {
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(5), "0m 5s");
    }
}
