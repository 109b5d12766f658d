//! Reminder settings and the query used by notification delivery.

use crate::calendar::CalendarDay;
use crate::habit::Habit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Daily reminder time for a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 9,
            minute: 0,
        }
    }
}

impl Reminder {
    /// Reminder at `hour:minute`, clamped to a valid wall-clock time.
    pub fn at(hour: u8, minute: u8) -> Self {
        Self {
            enabled: true,
            hour: hour.min(23),
            minute: minute.min(59),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "{:02}:{:02}", self.hour, self.minute)
        } else {
            write!(f, "off")
        }
    }
}

/// Whether a reminder for `habit` should fire on `today`.
pub fn should_remind(habit: &Habit, today: CalendarDay) -> bool {
    habit.reminder.enabled && !habit.is_completed_on(today)
}
