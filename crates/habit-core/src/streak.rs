//! Streak and completion-rate calculations over a completion history.
//!
//! All functions take "today" explicitly so results are a pure function of
//! the history and the day they are evaluated on.

use crate::calendar::CalendarDay;
use std::collections::BTreeSet;

/// Upper bound on days walked backward (ten years).
pub const MAX_STREAK_WALK: u32 = 3650;

/// Current and longest streak for a habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakInfo {
    /// Current streak count.
    pub current: u32,
    /// Best streak ever.
    pub longest: u32,
}

/// Consecutive completed days walking back from `today`.
///
/// Today counts when completed; when it is not, the walk still starts from
/// yesterday, so an unfinished today does not break a running streak until
/// the day is over.
pub fn current_streak(days: &BTreeSet<CalendarDay>, today: CalendarDay) -> u32 {
    let mut streak = u32::from(days.contains(&today));
    let mut cursor = today.pred();
    let mut steps = 0;

    while steps < MAX_STREAK_WALK && days.contains(&cursor) {
        streak += 1;
        cursor = cursor.pred();
        steps += 1;
    }
    streak
}

/// Consecutive completed days ending at `day` inclusive, without grace.
pub fn streak_up_to(days: &BTreeSet<CalendarDay>, day: CalendarDay) -> u32 {
    let mut streak = 0;
    let mut cursor = day;

    while streak < MAX_STREAK_WALK && days.contains(&cursor) {
        streak += 1;
        cursor = cursor.pred();
    }
    streak
}

/// Whether a running streak is still alive: today or yesterday completed.
pub fn should_maintain_streak(days: &BTreeSet<CalendarDay>, today: CalendarDay) -> bool {
    days.contains(&today) || days.contains(&today.pred())
}

/// Longest run of consecutive days anywhere in the history.
pub fn longest_run(days: &BTreeSet<CalendarDay>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<CalendarDay> = None;

    for &day in days {
        run = match previous {
            Some(prev) if prev.succ() == day => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Recompute streaks against `today`, keeping `longest` monotonic.
pub fn recompute(days: &BTreeSet<CalendarDay>, today: CalendarDay, longest: u32) -> StreakInfo {
    let current = current_streak(days, today);
    StreakInfo {
        current,
        longest: longest.max(current),
    }
}

/// Percentage (0-100, rounded) of the last `window_days` days, today
/// included, that are completed.
pub fn completion_rate(days: &BTreeSet<CalendarDay>, today: CalendarDay, window_days: u32) -> u32 {
    if window_days == 0 {
        return 0;
    }
    let completed = completions_in_window(days, today, window_days);
    // Round half up in integer arithmetic.
    let rate = (200 * u64::from(completed) + u64::from(window_days)) / (2 * u64::from(window_days));
    rate as u32
}

/// Completed days among the last `window_days` days, today included.
pub fn completions_in_window(
    days: &BTreeSet<CalendarDay>,
    today: CalendarDay,
    window_days: u32,
) -> u32 {
    if window_days == 0 {
        return 0;
    }
    let start = today.add_days(-i64::from(window_days - 1));
    days.range(start..=today).count() as u32
}
