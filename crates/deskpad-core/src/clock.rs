use std::cell::Cell;
use std::fmt::Debug;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

pub trait Clock: Debug {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for day-boundary logic (water reset, countdowns).
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Days are UTC days.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.now.get().date_naive()
    }
}

/// Fixed-period tick schedule. The owner polls it with the current time and
/// applies however many ticks have come due since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    next_due: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::seconds(1))
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Starting a running interval keeps its phase.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.period);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };
        if self.period <= Duration::zero() {
            return 0;
        }

        let mut ticks = 0;
        while due <= now {
            ticks += 1;
            due += self.period;
        }
        self.next_due = Some(due);
        ticks
    }
}

/// `HH:MM:SS`.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `MM:SS`.
pub fn format_ms(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
