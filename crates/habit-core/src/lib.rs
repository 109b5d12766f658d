//! Habit completion history and streak engine.
//!
//! Tracks which calendar days each habit was completed on, derives current
//! and longest streaks from that history, decides which habits are due on a
//! given day and normalizes transient state when the day rolls over.
//!
//! # Example
//!
//! ```
//! use habit_core::{CalendarDay, Habit};
//!
//! let monday = CalendarDay::from_ymd(2024, 6, 3).unwrap();
//! let mut habit = Habit::new("Read", monday).unwrap();
//! habit.set_completion(monday, true, monday).unwrap();
//! assert_eq!(habit.current_streak(), 1);
//! ```

pub mod calendar;
pub mod error;
pub mod export;
pub mod habit;
pub mod reconcile;
pub mod reminder;
pub mod schedule;
pub mod service;
pub mod stats;
pub mod store;
pub mod streak;

pub use calendar::{CalendarDay, Clock, FixedClock, SystemClock, WeekdaySet};
pub use error::{CoreError, CoreResult, DateFormatError, StoreError, StoreResult};
pub use export::{ExportDocument, ImportMode};
pub use habit::{Frequency, Habit, HabitEdit, HabitId};
pub use reconcile::ReconcileReport;
pub use reminder::Reminder;
pub use service::{HabitService, ImportReport};
pub use stats::{HabitSummary, Overview};
pub use store::{HabitStore, MemoryStore, SqliteStore};
pub use streak::StreakInfo;
