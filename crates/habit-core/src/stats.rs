//! Read-only statistics across habits.

use crate::calendar::CalendarDay;
use crate::habit::Habit;
use crate::schedule;
use crate::streak::{self, StreakInfo};

/// Dashboard totals across all habits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overview {
    /// Number of habits.
    pub total_habits: usize,
    /// Habits completed today.
    pub completed_today: usize,
    /// Highest current streak of any habit.
    pub best_current_streak: u32,
    /// Highest longest streak of any habit.
    pub best_longest_streak: u32,
    /// Completions per day of existence, as a percentage capped at 100.
    pub success_rate: u32,
    /// Average completions over the last seven days, per habit.
    pub weekly_average: u32,
}

/// Per-habit statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HabitSummary {
    pub streaks: StreakInfo,
    /// Percentage of the last `window` calendar days completed.
    pub completion_rate: u32,
    /// Days in the window on which the habit was due.
    pub active_days: u32,
    /// Due days in the window that were completed.
    pub completed_active_days: u32,
}

impl HabitSummary {
    /// Completed share of due days, rounded; 0 when nothing was due.
    pub fn adherence(&self) -> u32 {
        percent(self.completed_active_days, self.active_days)
    }
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((200 * u64::from(part) + u64::from(whole)) / (2 * u64::from(whole))) as u32
}

/// Compute the dashboard overview.
pub fn overview(habits: &[Habit], today: CalendarDay) -> Overview {
    let mut total_completions: u64 = 0;
    let mut total_possible: u64 = 0;
    let mut weekly_total: u32 = 0;

    for habit in habits {
        total_completions += habit.completed_days().len() as u64;
        total_possible += u64::from(habit.created_on().rate_divisor_days(today));
        weekly_total += streak::completions_in_window(habit.completed_days(), today, 7);
    }

    let success_rate = if total_possible == 0 {
        0
    } else {
        (total_completions * 100 / total_possible).min(100) as u32
    };

    Overview {
        total_habits: habits.len(),
        completed_today: habits.iter().filter(|h| h.is_completed_on(today)).count(),
        best_current_streak: habits.iter().map(Habit::current_streak).max().unwrap_or(0),
        best_longest_streak: habits.iter().map(Habit::longest_streak).max().unwrap_or(0),
        success_rate,
        weekly_average: if habits.is_empty() {
            0
        } else {
            weekly_total / habits.len() as u32
        },
    }
}

/// Statistics for one habit over the last `window` days.
pub fn summarize(habit: &Habit, today: CalendarDay, window: u32) -> HabitSummary {
    let start = today.add_days(-i64::from(window.saturating_sub(1)));
    let active_days = if window == 0 {
        0
    } else {
        schedule::active_days_in_range(habit, start, today)
    };
    let completed_active_days = if window == 0 {
        0
    } else {
        habit
            .completed_days()
            .range(start..=today)
            .filter(|d| schedule::is_active_on(habit, **d))
            .count() as u32
    };

    HabitSummary {
        streaks: habit.streaks(),
        completion_rate: habit.completion_rate(today, window),
        active_days,
        completed_active_days,
    }
}

/// Completions per day for the last `days` days, oldest first.
pub fn daily_completions(
    habits: &[Habit],
    today: CalendarDay,
    days: u32,
) -> Vec<(CalendarDay, usize)> {
    (0..days)
        .rev()
        .map(|offset| {
            let day = today.add_days(-i64::from(offset));
            let count = habits.iter().filter(|h| h.is_completed_on(day)).count();
            (day, count)
        })
        .collect()
}

/// Completions on each day of the current Monday-to-Sunday week.
pub fn week_completions(habits: &[Habit], today: CalendarDay) -> [usize; 7] {
    let monday = today.add_days(-i64::from(today.weekday().num_days_from_monday()));
    let mut counts = [0; 7];
    for (i, count) in counts.iter_mut().enumerate() {
        let day = monday.add_days(i as i64);
        *count = habits.iter().filter(|h| h.is_completed_on(day)).count();
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WeekdaySet;
    use crate::habit::Frequency;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    fn habit_with(created: CalendarDay, today: CalendarDay, offsets: &[i64]) -> Habit {
        let mut habit = Habit::new("H", created).unwrap();
        for o in offsets {
            habit.set_completion(today.add_days(-o), true, today).unwrap();
        }
        habit
    }

    #[test]
    fn test_overview() {
        // Wednesday.
        let today = day(2024, 1, 10);
        let habits = vec![
            habit_with(day(2024, 1, 1), today, &[0, 1, 2]),
            habit_with(day(2024, 1, 6), today, &[1, 3]),
        ];
        let o = overview(&habits, today);
        assert_eq!(o.total_habits, 2);
        assert_eq!(o.completed_today, 1);
        assert_eq!(o.best_current_streak, 3);
        assert_eq!(o.best_longest_streak, 3);
        // 5 completions over 9 + 4 days.
        assert_eq!(o.success_rate, 38);
        assert_eq!(o.weekly_average, 2);
    }

    #[test]
    fn test_overview_empty_and_capped() {
        let today = day(2024, 1, 10);
        assert_eq!(overview(&[], today), Overview::default());

        let fresh = habit_with(today.pred(), today, &[0, 1]);
        assert_eq!(overview(&[fresh], today).success_rate, 100);
    }

    #[test]
    fn test_summarize_counts_due_days() {
        // Monday 2024-01-01; Mon/Wed/Fri habit.
        let created = day(2024, 1, 1);
        let today = day(2024, 1, 14);
        let mut habit = Habit::new("Lift", created)
            .unwrap()
            .with_frequency(Frequency::Custom, "Mon,Wed,Fri".parse::<WeekdaySet>().unwrap());
        for d in [day(2024, 1, 8), day(2024, 1, 10), day(2024, 1, 13)] {
            habit.set_completion(d, true, today).unwrap();
        }

        let summary = summarize(&habit, today, 7);
        assert_eq!(summary.active_days, 3);
        assert_eq!(summary.completed_active_days, 2);
        assert_eq!(summary.adherence(), 67);
        assert_eq!(summary.completion_rate, 43);
        assert_eq!(summarize(&habit, today, 0).active_days, 0);
    }

    #[test]
    fn test_daily_and_week_series() {
        let today = day(2024, 1, 10);
        let habits = vec![
            habit_with(day(2024, 1, 1), today, &[0, 1, 2]),
            habit_with(day(2024, 1, 1), today, &[0, 9]),
        ];

        let series = daily_completions(&habits, today, 3);
        assert_eq!(series, vec![(day(2024, 1, 8), 1), (day(2024, 1, 9), 1), (day(2024, 1, 10), 2)]);

        // Week of Monday 2024-01-08.
        assert_eq!(week_completions(&habits, today), [1, 1, 2, 0, 0, 0, 0]);
    }
}
