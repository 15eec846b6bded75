use std::collections::BTreeMap;

use tracing::debug;

use crate::list::Record;
use crate::surface::Frame;
use crate::widgets::expenses::{Expense, format_money, round_cents, totals_by_category};
use crate::widgets::habits::Habit;
use crate::widgets::percent;
use crate::widgets::projects::{Project, ProjectStatus};
use crate::widgets::todos::Todo;

/// Minutes credited per completed focus session.
pub const FOCUS_SESSION_MINUTES: u64 = 25;
/// Expense averages are spread over a fixed month.
const AVERAGE_DAYS: f64 = 30.0;

/// Session copies of the collections the stats fold over. The dashboard
/// keeps it current from each list's commit hook, so it follows in-memory
/// state even when saving fails.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsInputs {
    pub todos: Vec<Record<Todo>>,
    pub expenses: Vec<Record<Expense>>,
    pub habits: Vec<Record<Habit>>,
    pub projects: Vec<Record<Project>>,
    pub focus_sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: u32,
    pub total_spent: f64,
    pub average_per_day: f64,
    pub category_count: usize,
    pub by_category: BTreeMap<String, f64>,
    pub total_habits: usize,
    pub longest_streak: u32,
    pub total_habit_days: u64,
    pub projects_by_status: BTreeMap<&'static str, usize>,
    pub productivity_score: u32,
    pub focus_sessions: u64,
}

impl DashboardStats {
    pub fn collect(inputs: &StatsInputs) -> Self {
        let StatsInputs {
            todos,
            expenses,
            habits,
            projects,
            focus_sessions,
        } = inputs;

        let completed_tasks = todos.iter().filter(|t| t.data.completed).count();
        let total_spent = round_cents(expenses.iter().map(|e| e.data.amount).sum());
        let average_per_day = if expenses.is_empty() {
            0.0
        } else {
            round_cents(total_spent / AVERAGE_DAYS)
        };
        let by_category = totals_by_category(expenses);

        let checked_habits = habits.iter().filter(|h| h.data.count > 0).count();
        let longest_streak = habits.iter().map(|h| h.data.count).max().unwrap_or(0);
        let total_habit_days = habits.iter().map(|h| u64::from(h.data.count)).sum();

        let projects_by_status = ProjectStatus::ALL
            .iter()
            .map(|status| {
                let count = projects.iter().filter(|p| p.data.status == *status).count();
                (status.label(), count)
            })
            .collect();

        let stats = Self {
            total_tasks: todos.len(),
            completed_tasks,
            completion_rate: percent(completed_tasks, todos.len()),
            total_spent,
            average_per_day,
            category_count: by_category.len(),
            by_category,
            total_habits: habits.len(),
            longest_streak,
            total_habit_days,
            projects_by_status,
            productivity_score: productivity_score(
                (completed_tasks, todos.len()),
                (checked_habits, habits.len()),
            ),
            focus_sessions: *focus_sessions,
        };
        debug!(?stats, "collected stats");
        stats
    }

    pub fn focus_minutes(&self) -> u64 {
        self.focus_sessions * FOCUS_SESSION_MINUTES
    }

    /// Longest habit run doubles as the current streak.
    pub fn current_streak(&self) -> u32 {
        self.longest_streak
    }

    /// Label/value pairs in display order.
    pub fn rows(&self, currency: &str) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Total tasks".to_string(), self.total_tasks.to_string()),
            ("Completed tasks".to_string(), self.completed_tasks.to_string()),
            ("Completion rate".to_string(), format!("{}%", self.completion_rate)),
            ("Total spent".to_string(), format_money(currency, self.total_spent)),
            (
                "Average per day".to_string(),
                format_money(currency, self.average_per_day),
            ),
            ("Categories".to_string(), self.category_count.to_string()),
            ("Habits".to_string(), self.total_habits.to_string()),
            ("Longest streak".to_string(), format!("{} days", self.longest_streak)),
            ("Total habit days".to_string(), self.total_habit_days.to_string()),
        ];
        rows.extend(
            self.projects_by_status
                .iter()
                .map(|(status, count)| (format!("Projects {status}"), count.to_string())),
        );
        rows.push((
            "Productivity score".to_string(),
            format!("{}%", self.productivity_score),
        ));
        rows.push(("Focus time".to_string(), format_focus_time(self.focus_minutes())));
        rows.push(("Current streak".to_string(), self.current_streak().to_string()));
        rows
    }

    pub fn frame(&self, currency: &str) -> Frame {
        Frame::Lines(
            self.rows(currency)
                .into_iter()
                .map(|(label, value)| format!("{label}: {value}"))
                .collect(),
        )
    }
}

/// Mean of the task completion ratio and the share of habits checked in at
/// least once, as a percentage. An empty list contributes zero.
pub fn productivity_score(tasks: (usize, usize), habits: (usize, usize)) -> u32 {
    let ratio = |(done, total): (usize, usize)| {
        if total == 0 {
            0.0
        } else {
            done as f64 / total as f64
        }
    };
    let score = ((ratio(tasks) + ratio(habits)) / 2.0 * 100.0).round();
    score.clamp(0.0, 100.0) as u32
}

/// `Nm`, or `Hh Mm` past the hour.
pub fn format_focus_time(minutes: u64) -> String {
    if minutes > 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}
