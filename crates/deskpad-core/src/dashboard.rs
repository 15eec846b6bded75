use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{ValidationError, WidgetResult};
use crate::events::{Event, EventBus, SubscriptionId};
use crate::stats::{DashboardStats, StatsInputs};
use crate::store::{Store, StoreKey};
use crate::surface::{Level, Notifier, View};
use crate::widgets::bookmarks::Bookmarks;
use crate::widgets::dates::ImportantDates;
use crate::widgets::expenses::Expenses;
use crate::widgets::goals::Goals;
use crate::widgets::habits::Habits;
use crate::widgets::notes::Notes;
use crate::widgets::pomodoro::Pomodoro;
use crate::widgets::projects::Projects;
use crate::widgets::quotes::Quotes;
use crate::widgets::reading::ReadingList;
use crate::widgets::time_tracker::TimeTracker;
use crate::widgets::todos::Todos;
use crate::widgets::water::Water;

pub const STATS_REGION: &str = "stats";

/// Handles every widget receives at construction.
#[derive(Debug, Clone)]
pub struct Services {
    pub store: Store,
    pub bus: EventBus,
    pub view: Rc<dyn View>,
    pub notifier: Rc<dyn Notifier>,
    pub clock: Rc<dyn Clock>,
}

impl Services {
    pub fn notify(&self, level: Level, message: &str) {
        self.notifier.notify(level, message);
    }

    /// Tells the user why `err` happened and hands it back.
    pub fn reject<T>(&self, err: ValidationError) -> WidgetResult<T> {
        debug!(error = %err, "rejected input");
        self.notify(err.level(), &err.to_string());
        Err(err)
    }

    pub fn changed(&self, key: StoreKey) {
        self.bus.publish(&Event::DataChanged { key });
    }
}

/// Every widget wired to one store and one event bus.
#[derive(Debug)]
pub struct Dashboard {
    pub services: Services,
    pub todos: Todos,
    pub expenses: Expenses,
    pub bookmarks: Bookmarks,
    pub projects: Projects,
    pub notes: Notes,
    pub quotes: Quotes,
    pub goals: Goals,
    pub water: Water,
    pub tracker: TimeTracker,
    pub reading: ReadingList,
    pub dates: ImportantDates,
    pub habits: Habits,
    pub pomodoro: Pomodoro,
    currency: String,
    stats_inputs: Rc<RefCell<StatsInputs>>,
    stats_subscription: SubscriptionId,
}

impl Dashboard {
    #[instrument(skip_all)]
    pub fn new(services: Services, settings: &Settings) -> Self {
        let stats_inputs = Rc::new(RefCell::new(StatsInputs::default()));
        let stats_subscription = subscribe_stats(
            &services,
            Rc::clone(&stats_inputs),
            settings.currency.clone(),
        );

        let mut dashboard = Self {
            todos: Todos::new(services.clone()),
            expenses: Expenses::new(services.clone(), &settings.currency),
            bookmarks: Bookmarks::new(services.clone()),
            projects: Projects::new(services.clone()),
            notes: Notes::new(services.clone()),
            quotes: Quotes::new(services.clone()),
            goals: Goals::new(services.clone()),
            water: Water::new(services.clone(), settings.water_goal),
            tracker: TimeTracker::new(services.clone()),
            reading: ReadingList::new(services.clone()),
            dates: ImportantDates::new(services.clone()),
            habits: Habits::new(services.clone()),
            pomodoro: Pomodoro::new(
                services.clone(),
                settings.pomodoro_work_minutes,
                settings.pomodoro_break_minutes,
            ),
            services,
            currency: settings.currency.clone(),
            stats_inputs,
            stats_subscription,
        };

        dashboard.mirror_stats_inputs();
        dashboard.refresh_stats();
        info!("dashboard ready");
        dashboard
    }

    /// Keeps the stats inputs in step with the in-memory collections.
    fn mirror_stats_inputs(&mut self) {
        let inputs = Rc::clone(&self.stats_inputs);
        self.todos
            .list_mut()
            .observe(move |items| inputs.borrow_mut().todos = items.to_vec());
        let inputs = Rc::clone(&self.stats_inputs);
        self.expenses
            .list_mut()
            .observe(move |items| inputs.borrow_mut().expenses = items.to_vec());
        let inputs = Rc::clone(&self.stats_inputs);
        self.habits
            .list_mut()
            .observe(move |items| inputs.borrow_mut().habits = items.to_vec());
        let inputs = Rc::clone(&self.stats_inputs);
        self.projects
            .list_mut()
            .observe(move |items| inputs.borrow_mut().projects = items.to_vec());
        self.stats_inputs.borrow_mut().focus_sessions = self.pomodoro.sessions_completed();
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::collect(&self.stats_inputs.borrow())
    }

    /// Recomputes the aggregate view without waiting for a change event.
    pub fn refresh_stats(&self) {
        self.services
            .view
            .draw(STATS_REGION, &self.stats().frame(&self.currency));
    }

    /// Writes every collection and scalar back to the store.
    #[instrument(skip(self))]
    pub fn save_all(&self) {
        self.todos.list().persist();
        self.expenses.list().persist();
        self.bookmarks.list().persist();
        self.projects.list().persist();
        self.notes.list().persist();
        self.quotes.favorites().persist();
        self.goals.list().persist();
        self.water.persist();
        self.tracker.persist();
        self.reading.list().persist();
        self.dates.list().persist();
        self.habits.list().persist();
        self.pomodoro.persist();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.services.bus.unsubscribe(self.stats_subscription);
    }
}

fn subscribe_stats(
    services: &Services,
    inputs: Rc<RefCell<StatsInputs>>,
    currency: String,
) -> SubscriptionId {
    let view = Rc::clone(&services.view);
    services.bus.subscribe(move |event| {
        match event {
            Event::DataChanged { key } => debug!(%key, "recomputing stats"),
            Event::FocusSessionCompleted { total } => inputs.borrow_mut().focus_sessions = *total,
            Event::WaterGoalReached { .. } => return Ok(()),
        }
        let fresh = DashboardStats::collect(&inputs.borrow());
        view.draw(STATS_REGION, &fresh.frame(&currency));
        Ok(())
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;

    use chrono::{TimeZone, Utc};

    use super::Services;
    use crate::clock::ManualClock;
    use crate::events::EventBus;
    use crate::store::{MemoryBackend, Store};
    use crate::surface::{RecordingNotifier, RecordingView};

    pub(crate) struct Harness {
        pub services: Services,
        pub backend: MemoryBackend,
        pub view: Rc<RecordingView>,
        pub notifier: Rc<RecordingNotifier>,
        pub clock: Rc<ManualClock>,
    }

    impl Harness {
        pub fn new() -> Self {
            let backend = MemoryBackend::new();
            let view = Rc::new(RecordingView::new());
            let notifier = Rc::new(RecordingNotifier::new());
            let clock = Rc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap(),
            ));
            let services = Services {
                store: Store::new(backend.clone()),
                bus: EventBus::new(),
                view: view.clone(),
                notifier: notifier.clone(),
                clock: clock.clone(),
            };
            Self {
                services,
                backend,
                view,
                notifier,
                clock,
            }
        }

        pub fn last_message(&self) -> Option<String> {
            self.notifier.last().map(|(_, message)| message)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::Dashboard;
    use crate::clock::Clock;
    use crate::config::Settings;
    use crate::dashboard::test_support::Harness;

    #[test]
    fn dropping_dashboard_releases_stats_subscription() {
        let h = Harness::new();
        let before = h.services.bus.subscriber_count();

        let dashboard = Dashboard::new(h.services.clone(), &Settings::default());
        assert_eq!(h.services.bus.subscriber_count(), before + 1);

        drop(dashboard);
        assert_eq!(h.services.bus.subscriber_count(), before);
    }

    #[test]
    fn focus_sessions_reach_stats() {
        let h = Harness::new();
        let settings = Settings {
            pomodoro_work_minutes: 1,
            ..Settings::default()
        };
        let mut dashboard = Dashboard::new(h.services.clone(), &settings);
        assert_eq!(dashboard.stats().focus_sessions, 0);

        dashboard.pomodoro.start(h.clock.now());
        h.clock.advance(Duration::seconds(60));
        dashboard.pomodoro.poll(h.clock.now());

        assert_eq!(dashboard.stats().focus_sessions, 1);
        let frame = h.view.frame("stats").expect("stats drawn");
        assert!(frame.lines().contains(&"Focus time: 25m".to_string()));
    }
}
