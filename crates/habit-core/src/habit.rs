//! The habit record: identity, schedule and completion history.

use crate::calendar::{CalendarDay, WeekdaySet};
use crate::error::{CoreError, CoreResult};
use crate::reminder::Reminder;
use crate::streak;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique habit identifier.
pub type HabitId = Uuid;

/// Goal text used when none is given.
pub const DEFAULT_GOAL: &str = "Once a day";
/// Default display color (opaque green, ARGB).
pub const DEFAULT_COLOR: u32 = 0xFF4C_AF50;
pub const DEFAULT_ICON: &str = "check";
pub const DEFAULT_CATEGORY: &str = "Other";

/// Which calendar days a habit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    /// Every day.
    #[default]
    Daily,
    /// Every Monday.
    Weekly,
    /// The habit's scheduled weekdays, or every day when none are set.
    Custom,
}

impl Frequency {
    /// Parse a stored label; absent, empty or unknown labels mean `Daily`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(l) if l.eq_ignore_ascii_case("weekly") => Self::Weekly,
            Some(l) if l.eq_ignore_ascii_case("custom") => Self::Custom,
            _ => Self::Daily,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(Some(s)))
    }
}

/// A trackable habit.
///
/// The streak fields are derived from `completed_days` and can only change
/// through [`Habit::set_completion`] or [`Habit::refresh_streaks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
    pub(crate) id: HabitId,
    pub(crate) name: String,
    /// Goal description.
    pub goal: String,
    /// Display color (ARGB).
    pub color: u32,
    /// Icon tag.
    pub icon: String,
    pub category: String,
    pub frequency: Frequency,
    /// Weekdays for [`Frequency::Custom`].
    pub scheduled_days: WeekdaySet,
    pub reminder: Reminder,
    pub(crate) created_on: CalendarDay,
    pub(crate) completed_days: BTreeSet<CalendarDay>,
    pub(crate) current_streak: u32,
    pub(crate) longest_streak: u32,
    pub(crate) last_reconciled_on: Option<CalendarDay>,
    pub(crate) checked_today: bool,
}

impl Habit {
    /// Create a daily habit with an empty history.
    pub fn new(name: impl Into<String>, created_on: CalendarDay) -> CoreResult<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            goal: DEFAULT_GOAL.to_string(),
            color: DEFAULT_COLOR,
            icon: DEFAULT_ICON.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            frequency: Frequency::Daily,
            scheduled_days: WeekdaySet::EMPTY,
            reminder: Reminder::default(),
            created_on,
            completed_days: BTreeSet::new(),
            current_streak: 0,
            longest_streak: 0,
            last_reconciled_on: None,
            checked_today: false,
        })
    }

    /// Set the goal text; blank text falls back to the default goal.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = normalize_goal(goal.into());
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency, scheduled_days: WeekdaySet) -> Self {
        self.frequency = frequency;
        self.scheduled_days = scheduled_days;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_reminder(mut self, reminder: Reminder) -> Self {
        self.reminder = reminder;
        self
    }

    pub fn id(&self) -> HabitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the habit.
    pub fn rename(&mut self, name: impl Into<String>) -> CoreResult<()> {
        self.name = validate_name(name.into())?;
        Ok(())
    }

    /// Apply a detail edit. Nothing changes if the edit is rejected.
    pub fn apply(&mut self, edit: HabitEdit) -> CoreResult<()> {
        let name = edit.name.map(validate_name).transpose()?;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(goal) = edit.goal {
            self.goal = normalize_goal(goal);
        }
        if let Some(color) = edit.color {
            self.color = color;
        }
        if let Some(icon) = edit.icon {
            self.icon = icon;
        }
        if let Some(category) = edit.category {
            self.category = category;
        }
        if let Some(frequency) = edit.frequency {
            self.frequency = frequency;
        }
        if let Some(days) = edit.scheduled_days {
            self.scheduled_days = days;
        }
        if let Some(reminder) = edit.reminder {
            self.reminder = reminder;
        }
        Ok(())
    }

    /// Day the habit was created.
    pub fn created_on(&self) -> CalendarDay {
        self.created_on
    }

    /// Completed days in ascending order.
    pub fn completed_days(&self) -> &BTreeSet<CalendarDay> {
        &self.completed_days
    }

    pub fn is_completed_on(&self, day: CalendarDay) -> bool {
        self.completed_days.contains(&day)
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    /// Last day reconciliation processed this habit.
    pub fn last_reconciled_on(&self) -> Option<CalendarDay> {
        self.last_reconciled_on
    }

    /// Whether the habit was completed on the day it was last reconciled.
    pub fn checked_today(&self) -> bool {
        self.checked_today
    }

    pub fn streaks(&self) -> streak::StreakInfo {
        streak::StreakInfo {
            current: self.current_streak,
            longest: self.longest_streak,
        }
    }

    /// Mark or unmark `day`, then recompute streaks against `today`.
    ///
    /// Returns whether the history changed. Marking a day before the habit
    /// was created is rejected; unmarking is always allowed.
    pub fn set_completion(
        &mut self,
        day: CalendarDay,
        completed: bool,
        today: CalendarDay,
    ) -> CoreResult<bool> {
        let changed = if completed {
            if day < self.created_on {
                return Err(CoreError::BeforeCreation {
                    day,
                    created_on: self.created_on,
                });
            }
            self.completed_days.insert(day)
        } else {
            self.completed_days.remove(&day)
        };

        if day == today {
            self.checked_today = completed;
        }
        self.refresh_streaks(today);
        Ok(changed)
    }

    /// Recompute the derived streak fields against `today`.
    pub fn refresh_streaks(&mut self, today: CalendarDay) {
        let info = streak::recompute(&self.completed_days, today, self.longest_streak);
        self.current_streak = info.current;
        self.longest_streak = info.longest;
    }

    /// Rebuild streaks from history alone, discarding the stored longest.
    pub(crate) fn rebuild_streaks(&mut self, today: CalendarDay) {
        self.longest_streak = streak::longest_run(&self.completed_days);
        self.refresh_streaks(today);
    }

    /// Completion percentage over the last `window_days` days.
    pub fn completion_rate(&self, today: CalendarDay, window_days: u32) -> u32 {
        streak::completion_rate(&self.completed_days, today, window_days)
    }
}

/// A partial update of a habit's editable attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitEdit {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub color: Option<u32>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<Frequency>,
    pub scheduled_days: Option<WeekdaySet>,
    pub reminder: Option<Reminder>,
}

impl HabitEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn validate_name(name: String) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn normalize_goal(goal: String) -> String {
    if goal.trim().is_empty() {
        DEFAULT_GOAL.to_string()
    } else {
        goal
    }
}
