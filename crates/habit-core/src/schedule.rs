//! Which calendar days a habit applies to.

use crate::calendar::CalendarDay;
use crate::habit::{Frequency, Habit};
use chrono::Weekday;

/// Whether `habit` is active (due) on `day`.
pub fn is_active_on(habit: &Habit, day: CalendarDay) -> bool {
    if day < habit.created_on() {
        return false;
    }
    match habit.frequency {
        Frequency::Daily => true,
        // Anchored to Monday, not to the weekday the habit was created on.
        Frequency::Weekly => day.weekday() == Weekday::Mon,
        Frequency::Custom => {
            habit.scheduled_days.is_empty() || habit.scheduled_days.contains(day.weekday())
        }
    }
}

/// Number of active days in the inclusive range `from..=to`.
pub fn active_days_in_range(habit: &Habit, from: CalendarDay, to: CalendarDay) -> u32 {
    if from > to {
        return 0;
    }
    let mut count = 0;
    let mut cursor = from.max(habit.created_on());
    while cursor <= to {
        if is_active_on(habit, cursor) {
            count += 1;
        }
        if cursor.date() == chrono::NaiveDate::MAX {
            break;
        }
        cursor = cursor.succ();
    }
    count
}

/// Habits from `habits` that are active on `day`.
pub fn active_on<'a>(
    habits: &'a [Habit],
    day: CalendarDay,
) -> impl Iterator<Item = &'a Habit> + 'a {
    habits.iter().filter(move |h| is_active_on(h, day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WeekdaySet;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    // 2024-01-01 is a Monday.
    fn habit(frequency: Frequency, days: WeekdaySet) -> Habit {
        Habit::new("Test", day(2024, 1, 1))
            .unwrap()
            .with_frequency(frequency, days)
    }

    #[test]
    fn test_never_active_before_creation() {
        for frequency in [Frequency::Daily, Frequency::Weekly, Frequency::Custom] {
            let h = habit(frequency, WeekdaySet::EMPTY);
            assert!(!is_active_on(&h, day(2023, 12, 25)));
            assert!(!is_active_on(&h, day(2023, 12, 31)));
        }
    }

    #[test]
    fn test_daily() {
        let h = habit(Frequency::Daily, WeekdaySet::EMPTY);
        assert!(is_active_on(&h, day(2024, 1, 1)));
        assert!(is_active_on(&h, day(2024, 1, 2)));
        assert!(is_active_on(&h, day(2025, 7, 19)));
    }

    #[test]
    fn test_weekly_is_monday_only() {
        let h = Habit::new("Test", day(2024, 1, 3))
            .unwrap()
            .with_frequency(Frequency::Weekly, WeekdaySet::EMPTY);
        // Created on a Wednesday; still only Mondays count.
        assert!(!is_active_on(&h, day(2024, 1, 3)));
        assert!(!is_active_on(&h, day(2024, 1, 10)));
        assert!(is_active_on(&h, day(2024, 1, 8)));
        assert!(is_active_on(&h, day(2024, 1, 15)));
    }

    #[test]
    fn test_custom_days() {
        let h = habit(Frequency::Custom, "Tue,Thu".parse().unwrap());
        assert!(!is_active_on(&h, day(2024, 1, 1)));
        assert!(is_active_on(&h, day(2024, 1, 2)));
        assert!(!is_active_on(&h, day(2024, 1, 3)));
        assert!(is_active_on(&h, day(2024, 1, 4)));
    }

    #[test]
    fn test_empty_custom_matches_daily() {
        let custom = habit(Frequency::Custom, WeekdaySet::EMPTY);
        let daily = habit(Frequency::Daily, WeekdaySet::EMPTY);
        let mut d = day(2023, 12, 20);
        for _ in 0..60 {
            assert_eq!(is_active_on(&custom, d), is_active_on(&daily, d));
            d = d.succ();
        }
    }

    #[test]
    fn test_active_days_in_range() {
        let weekly = habit(Frequency::Weekly, WeekdaySet::EMPTY);
        assert_eq!(active_days_in_range(&weekly, day(2024, 1, 1), day(2024, 1, 31)), 5);
        let daily = habit(Frequency::Daily, WeekdaySet::EMPTY);
        assert_eq!(active_days_in_range(&daily, day(2023, 12, 1), day(2024, 1, 10)), 10);
        assert_eq!(active_days_in_range(&daily, day(2024, 1, 10), day(2024, 1, 1)), 0);
    }

    #[test]
    fn test_active_on_filters() {
        let habits = vec![
            habit(Frequency::Daily, WeekdaySet::EMPTY),
            habit(Frequency::Weekly, WeekdaySet::EMPTY),
        ];
        assert_eq!(active_on(&habits, day(2024, 1, 1)).count(), 2);
        assert_eq!(active_on(&habits, day(2024, 1, 2)).count(), 1);
    }
}
