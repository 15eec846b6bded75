use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::clock::{Interval, format_ms};
use crate::dashboard::Services;
use crate::events::Event;
use crate::store::StoreKey;
use crate::surface::{Frame, Level};

pub const POMODORO_REGION: &str = "pomodoro";
pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Break,
}

/// Heading shown above the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Working,
    OnBreak,
}

impl Status {
    pub fn text(self) -> &'static str {
        match self {
            Status::Ready => "Ready to focus",
            Status::Working => "💪 Work Time!",
            Status::OnBreak => "☕ Break Time!",
        }
    }
}

/// Work/break countdown. Each elapsed second of a running timer takes one
/// off the remaining time; hitting zero flips the phase and keeps going.
#[derive(Debug)]
pub struct Pomodoro {
    services: Services,
    work_seconds: u64,
    break_seconds: u64,
    phase: Phase,
    status: Status,
    remaining: u64,
    ticker: Interval,
    sessions: u64,
}

impl Pomodoro {
    pub fn new(services: Services, work_minutes: u32, break_minutes: u32) -> Self {
        let sessions = services.store.load(StoreKey::FocusSessions, 0u64);
        let work_seconds = u64::from(work_minutes.max(1)) * 60;
        Self {
            services,
            work_seconds,
            break_seconds: u64::from(break_minutes.max(1)) * 60,
            phase: Phase::Work,
            status: Status::Ready,
            remaining: work_seconds,
            ticker: Interval::every_second(),
            sessions,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn sessions_completed(&self) -> u64 {
        self.sessions
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_ms(self.remaining)
    }

    #[instrument(skip(self))]
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.is_running() {
            return;
        }
        if self.remaining == 0 {
            self.reset();
        }
        self.ticker.start(now);
        debug!(phase = ?self.phase, remaining = self.remaining, "pomodoro started");
        self.render();
    }

    pub fn pause(&mut self) {
        if !self.is_running() {
            return;
        }
        self.ticker.stop();
        self.render();
    }

    pub fn reset(&mut self) {
        self.ticker.stop();
        self.phase = Phase::Work;
        self.status = Status::Ready;
        self.remaining = self.work_seconds;
        self.render();
    }

    /// Applies every second that came due since the last poll.
    pub fn poll(&mut self, now: DateTime<Utc>) -> u32 {
        let ticks = self.ticker.poll(now);
        for _ in 0..ticks {
            if self.remaining > 0 {
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.switch_phase();
                }
            }
        }
        if ticks > 0 {
            self.render();
        }
        ticks
    }

    pub fn persist(&self) {
        self.services.store.save(StoreKey::FocusSessions, &self.sessions);
    }

    pub fn render(&self) -> Frame {
        let frame = Frame::Lines(vec![
            self.status.text().to_string(),
            self.display(),
            format!("Sessions: {}", self.sessions),
        ]);
        self.services.view.draw(POMODORO_REGION, &frame);
        frame
    }

    fn switch_phase(&mut self) {
        let finished = self.phase;
        (self.phase, self.status, self.remaining) = match finished {
            Phase::Work => (Phase::Break, Status::OnBreak, self.break_seconds),
            Phase::Break => (Phase::Work, Status::Working, self.work_seconds),
        };
        if finished == Phase::Work {
            self.complete_session();
        }
    }

    fn complete_session(&mut self) {
        self.sessions += 1;
        info!(total = self.sessions, "focus session completed");
        self.persist();
        self.render();
        self.services
            .notify(Level::Success, "Great work! Focus session completed! 🎉");
        self.services.changed(StoreKey::FocusSessions);
        self.services.bus.publish(&Event::FocusSessionCompleted {
            total: self.sessions,
        });
    }
}
