use thiserror::Error;

use crate::surface::Level;

pub type WidgetResult<T> = core::result::Result<T, ValidationError>;

/// Input rejected by a widget before anything was stored. The message is
/// what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a task")]
    EmptyTask,
    #[error("Please enter valid expense details")]
    InvalidExpense,
    #[error("Please enter both title and URL")]
    MissingBookmarkFields,
    #[error("Please enter a valid URL")]
    InvalidUrl,
    #[error("Please enter a project name")]
    EmptyProjectName,
    #[error("Please enter a title or content")]
    EmptyNote,
    #[error("Already in favorites!")]
    AlreadyFavorite,
    #[error("Please enter a goal")]
    EmptyGoal,
    #[error("Please enter an activity name")]
    EmptyActivity,
    #[error("Stop current activity first")]
    ActivityRunning,
    #[error("Please enter book title")]
    EmptyBookTitle,
    #[error("Please enter event name and date")]
    MissingDateFields,
    #[error("Please enter a habit name")]
    EmptyHabit,
    #[error("Please enter a city name")]
    EmptyCity,
    #[error("Daily goal must be at least 1")]
    InvalidWaterGoal,
    #[error("invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("unknown priority: {0} (expected low, medium or high)")]
    UnknownPriority(String),
    #[error("unknown project status: {0}")]
    UnknownStatus(String),
}

impl ValidationError {
    pub fn level(&self) -> Level {
        match self {
            ValidationError::EmptyNote | ValidationError::AlreadyFavorite => Level::Warning,
            _ => Level::Error,
        }
    }
}
