//! Error types for the habit engine.

use crate::calendar::CalendarDay;
use crate::habit::HabitId;
use thiserror::Error;

/// A day string that is not a valid `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid calendar day: {input:?} (expected YYYY-MM-DD)")]
pub struct DateFormatError {
    /// The rejected input.
    pub input: String,
}

impl DateFormatError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Corrupt record: {0}")]
    DateFormat(#[from] DateFormatError),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by habit operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No habit with this identifier exists.
    #[error("Habit not found: {0}")]
    NotFound(HabitId),

    /// Habit names must contain at least one non-whitespace character.
    #[error("Habit name must not be empty")]
    EmptyName,

    /// Completions cannot be recorded before the habit existed.
    #[error("Cannot mark {day}: habit was created on {created_on}")]
    BeforeCreation {
        day: CalendarDay,
        created_on: CalendarDay,
    },

    #[error(transparent)]
    DateFormat(#[from] DateFormatError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
