//! Day-boundary reconciliation of transient per-day state.

use crate::calendar::CalendarDay;
use crate::habit::Habit;

/// Outcome of reconciling every stored habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Habits updated and saved.
    pub reconciled: usize,
    /// Habits already reconciled today.
    pub unchanged: usize,
    /// Habits whose load or save failed.
    pub failed: usize,
}

/// Bring `habit` up to date for `today`. Returns whether anything changed.
///
/// Completion history is never touched. The first pass on a new day resyncs
/// `checked_today` and refreshes the derived streaks; later passes on the same
/// day are no-ops.
pub fn reconcile_habit(habit: &mut Habit, today: CalendarDay) -> bool {
    if habit.last_reconciled_on == Some(today) {
        return false;
    }
    habit.checked_today = habit.is_completed_on(today);
    habit.last_reconciled_on = Some(today);
    habit.refresh_streaks(today);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_first_pass_resets_checked_today() {
        let monday = day(2024, 6, 3);
        let mut habit = Habit::new("Floss", monday).unwrap();
        habit.set_completion(monday, true, monday).unwrap();
        assert!(habit.checked_today());

        let tuesday = monday.succ();
        assert!(reconcile_habit(&mut habit, tuesday));
        assert!(!habit.checked_today());
        assert_eq!(habit.last_reconciled_on(), Some(tuesday));
        assert_eq!(habit.completed_days().len(), 1);
        // Yesterday still carries the streak.
        assert_eq!(habit.current_streak(), 1);
    }

    #[test]
    fn test_second_pass_same_day_is_noop() {
        let today = day(2024, 6, 3);
        let mut habit = Habit::new("Floss", today.add_days(-5)).unwrap();
        habit.set_completion(today, true, today).unwrap();

        assert!(reconcile_habit(&mut habit, today));
        let after_first = habit.clone();
        assert!(!reconcile_habit(&mut habit, today));
        assert_eq!(habit, after_first);
        assert!(habit.checked_today());
    }

    #[test]
    fn test_stale_streak_refreshed_on_new_day() {
        let start = day(2024, 6, 1);
        let mut habit = Habit::new("Floss", start).unwrap();
        for offset in 0..3 {
            let d = start.add_days(offset);
            habit.set_completion(d, true, d).unwrap();
        }
        assert_eq!(habit.current_streak(), 3);

        // Two days later the run is over, the record is kept.
        let later = start.add_days(4);
        assert!(reconcile_habit(&mut habit, later));
        assert_eq!(habit.current_streak(), 0);
        assert_eq!(habit.longest_streak(), 3);
        assert_eq!(habit.completed_days().len(), 3);
    }
}
