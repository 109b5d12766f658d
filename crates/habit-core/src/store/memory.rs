//! In-memory habit storage.

use super::HabitStore;
use crate::error::StoreResult;
use crate::habit::{Habit, HabitId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Habit store kept in a hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    habits: RwLock<HashMap<HabitId, Habit>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.habits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.read().is_empty()
    }
}

impl HabitStore for MemoryStore {
    fn load_all(&self) -> StoreResult<Vec<Habit>> {
        let mut habits: Vec<Habit> = self.habits.read().values().cloned().collect();
        habits.sort_by(|a, b| {
            a.created_on()
                .cmp(&b.created_on())
                .then_with(|| a.name().cmp(b.name()))
        });
        Ok(habits)
    }

    fn load(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        Ok(self.habits.read().get(&id).cloned())
    }

    fn save(&self, habit: &Habit) -> StoreResult<()> {
        self.habits.write().insert(habit.id(), habit.clone());
        Ok(())
    }

    fn delete(&self, id: HabitId) -> StoreResult<bool> {
        Ok(self.habits.write().remove(&id).is_some())
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let mut habits = self.habits.write();
        let count = habits.len();
        habits.clear();
        Ok(count)
    }

    fn replace_all(&self, habits: &[Habit]) -> StoreResult<usize> {
        let replacement: HashMap<_, _> = habits.iter().map(|h| (h.id(), h.clone())).collect();
        let previous = std::mem::replace(&mut *self.habits.write(), replacement);
        Ok(previous.len())
    }
}
