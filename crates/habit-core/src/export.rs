//! JSON export and import of habits.
//!
//! Imported streak numbers are never trusted: streaks are rebuilt from the
//! imported history, and each malformed record is skipped and reported
//! without failing the rest of the batch.

use crate::calendar::{CalendarDay, WeekdaySet};
use crate::error::{CoreResult, DateFormatError};
use crate::habit::{Frequency, Habit, DEFAULT_CATEGORY, DEFAULT_COLOR, DEFAULT_GOAL, DEFAULT_ICON};
use crate::reconcile::reconcile_habit;
use crate::reminder::Reminder;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Name given to imported habits without one.
pub const IMPORTED_NAME: &str = "Imported Habit";

const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What to do with existing habits on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Delete every stored habit first.
    Replace,
    /// Keep stored habits; colliding ids get a fresh id.
    #[default]
    Merge,
}

/// Serialized form of one habit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    /// ARGB color; negative values are read as their two's-complement bits.
    #[serde(default)]
    pub color: Option<i64>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    /// Also read from the older `selectedDays` key.
    #[serde(default, alias = "selectedDays")]
    pub scheduled_days: WeekdaySet,
    #[serde(default, alias = "createdDate")]
    pub created_on: Option<String>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default, alias = "completedDates")]
    pub completed_days: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

impl From<&Habit> for HabitRecord {
    fn from(habit: &Habit) -> Self {
        Self {
            id: Some(habit.id().to_string()),
            name: Some(habit.name().to_string()),
            goal: Some(habit.goal.clone()),
            color: Some(i64::from(habit.color)),
            icon: Some(habit.icon.clone()),
            category: Some(habit.category.clone()),
            frequency: Some(habit.frequency.label().to_string()),
            scheduled_days: habit.scheduled_days,
            created_on: Some(habit.created_on().to_string()),
            current_streak: habit.current_streak(),
            longest_streak: habit.longest_streak(),
            completed_days: habit.completed_days().iter().map(ToString::to_string).collect(),
            reminder: Some(habit.reminder),
        }
    }
}

impl HabitRecord {
    /// Rebuild a habit from this record, recomputing streaks against `today`.
    ///
    /// A missing creation day falls back to the earliest completed day, or
    /// `today` for an empty history. An id that is not a UUID is replaced.
    pub fn into_habit(self, today: CalendarDay) -> Result<Habit, DateFormatError> {
        let completed_days = self
            .completed_days
            .iter()
            .map(|d| CalendarDay::parse(d))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let created_on = match self.created_on.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => CalendarDay::parse(raw)?,
            _ => completed_days.first().copied().map_or(today, |first| first.min(today)),
        };

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| IMPORTED_NAME.to_string());

        let mut habit = Habit {
            id: self
                .id
                .as_deref()
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .unwrap_or_else(Uuid::new_v4),
            name,
            goal: non_blank(self.goal).unwrap_or_else(|| DEFAULT_GOAL.to_string()),
            color: match self.color {
                None | Some(0) => DEFAULT_COLOR,
                // Truncation keeps the ARGB bits of signed 32-bit colors.
                Some(c) => c as u32,
            },
            icon: non_blank(self.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
            category: non_blank(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            frequency: Frequency::from_label(self.frequency.as_deref()),
            scheduled_days: self.scheduled_days,
            reminder: self.reminder.unwrap_or_default(),
            created_on,
            completed_days,
            current_streak: 0,
            longest_streak: 0,
            last_reconciled_on: None,
            checked_today: false,
        };

        habit.rebuild_streaks(today);
        if habit.current_streak() != self.current_streak
            || habit.longest_streak() != self.longest_streak
        {
            tracing::debug!(
                id = %habit.id(),
                imported_current = self.current_streak,
                imported_longest = self.longest_streak,
                current = habit.current_streak(),
                longest = habit.longest_streak(),
                "imported streaks disagree with history; using recomputed values"
            );
        }
        reconcile_habit(&mut habit, today);
        Ok(habit)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Top-level export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_date: String,
    pub total_habits: usize,
    pub habits: Vec<HabitRecord>,
}

impl ExportDocument {
    pub fn new(habits: &[Habit], exported_at: NaiveDateTime) -> Self {
        Self {
            export_date: exported_at.format(EXPORT_DATE_FORMAT).to_string(),
            total_habits: habits.len(),
            habits: habits.iter().map(HabitRecord::from).collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A record left out of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position in the `habits` array.
    pub index: usize,
    pub reason: String,
}

/// Habits decoded from an export file.
#[derive(Debug, Default)]
pub struct DecodedImport {
    pub habits: Vec<Habit>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Deserialize)]
struct RawDocument {
    habits: Vec<serde_json::Value>,
}

/// Decode an export file. Only an unreadable document as a whole is an error.
pub fn decode(json: &str, today: CalendarDay) -> CoreResult<DecodedImport> {
    let raw: RawDocument = serde_json::from_str(json)?;
    let mut decoded = DecodedImport::default();

    for (index, value) in raw.habits.into_iter().enumerate() {
        let result = serde_json::from_value::<HabitRecord>(value)
            .map_err(|e| e.to_string())
            .and_then(|record| record.into_habit(today).map_err(|e| e.to_string()));
        match result {
            Ok(habit) => decoded.habits.push(habit),
            Err(reason) => {
                tracing::warn!(index, %reason, "skipping malformed habit record");
                decoded.skipped.push(SkippedRecord { index, reason });
            }
        }
    }
    Ok(decoded)
}
