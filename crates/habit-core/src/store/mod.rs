//! Keyed habit storage.
//!
//! The engine needs only "all" and "by id" access. Implementations are
//! synchronous; the service moves calls onto blocking threads.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use crate::habit::{Habit, HabitId};

/// Persistence collaborator for habit records.
pub trait HabitStore: Send + Sync {
    /// Load every readable habit. Corrupt records are skipped.
    fn load_all(&self) -> StoreResult<Vec<Habit>>;

    /// Load one habit.
    fn load(&self, id: HabitId) -> StoreResult<Option<Habit>>;

    /// Insert or replace a habit.
    fn save(&self, habit: &Habit) -> StoreResult<()>;

    /// Delete a habit and its history. Returns whether it existed.
    fn delete(&self, id: HabitId) -> StoreResult<bool>;

    /// Delete every habit. Returns how many were removed.
    fn delete_all(&self) -> StoreResult<usize>;

    /// Replace the whole contents with `habits` as one unit: on error the
    /// previous contents stay. Returns how many habits were removed.
    fn replace_all(&self, habits: &[Habit]) -> StoreResult<usize>;
}
