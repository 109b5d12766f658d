//! SQLite-backed habit storage.

use super::HabitStore;
use crate::calendar::{CalendarDay, WeekdaySet};
use crate::error::{StoreError, StoreResult};
use crate::habit::{Frequency, Habit, HabitId};
use crate::reminder::Reminder;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use std::collections::BTreeSet;
use std::path::Path;
use uuid::Uuid;

/// Database connection wrapper.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create database at path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create in-memory database (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize database schema.
    fn init(&self) -> StoreResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS habits (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                goal TEXT NOT NULL,
                color INTEGER NOT NULL,
                icon TEXT NOT NULL,
                category TEXT NOT NULL,
                frequency TEXT NOT NULL,
                scheduled_days TEXT NOT NULL DEFAULT '',
                reminder_enabled INTEGER NOT NULL DEFAULT 1,
                reminder_hour INTEGER NOT NULL DEFAULT 9,
                reminder_minute INTEGER NOT NULL DEFAULT 0,
                created_on TEXT NOT NULL,
                completed_days TEXT NOT NULL DEFAULT '[]',
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_reconciled_on TEXT,
                checked_today INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_habits_created ON habits(created_on);
            "#,
        )?;
        Ok(())
    }
}

impl HabitStore for SqliteStore {
    fn load_all(&self) -> StoreResult<Vec<Habit>> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare("SELECT * FROM habits ORDER BY created_on, name")?;
            let rows = stmt.query_map([], HabitRow::from_row)?.collect::<Vec<_>>();
            rows
        };

        let mut habits = Vec::with_capacity(rows.len());
        for (position, row) in rows.into_iter().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(
                    err @ (rusqlite::Error::FromSqlConversionFailure(..)
                    | rusqlite::Error::InvalidColumnType(..)
                    | rusqlite::Error::IntegralValueOutOfRange(..)),
                ) => {
                    tracing::warn!(position, %err, "skipping undecodable habit row");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let id = row.id.clone();
            match row.into_habit() {
                Ok(habit) => habits.push(habit),
                Err(err) => tracing::warn!(%id, %err, "skipping unreadable habit record"),
            }
        }
        Ok(habits)
    }

    fn load(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        let row = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare("SELECT * FROM habits WHERE id = ?1")?;
            let row = stmt.query_row(params![id.to_string()], HabitRow::from_row).optional()?;
            row
        };
        row.map(HabitRow::into_habit).transpose()
    }

    fn save(&self, habit: &Habit) -> StoreResult<()> {
        upsert(&self.conn.lock(), habit)
    }

    fn delete(&self, id: HabitId) -> StoreResult<bool> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM habits WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    fn delete_all(&self) -> StoreResult<usize> {
        Ok(self.conn.lock().execute("DELETE FROM habits", [])?)
    }

    fn replace_all(&self, habits: &[Habit]) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM habits", [])?;
        for habit in habits {
            upsert(&tx, habit)?;
        }
        tx.commit()?;
        Ok(removed)
    }
}

fn upsert(conn: &Connection, habit: &Habit) -> StoreResult<()> {
    let completed: Vec<String> = habit.completed_days.iter().map(ToString::to_string).collect();
    let completed = serde_json::to_string(&completed)?;

    conn.execute(
        r#"
        INSERT INTO habits (id, name, goal, color, icon, category, frequency, scheduled_days,
                            reminder_enabled, reminder_hour, reminder_minute, created_on,
                            completed_days, current_streak, longest_streak,
                            last_reconciled_on, checked_today)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            goal = excluded.goal,
            color = excluded.color,
            icon = excluded.icon,
            category = excluded.category,
            frequency = excluded.frequency,
            scheduled_days = excluded.scheduled_days,
            reminder_enabled = excluded.reminder_enabled,
            reminder_hour = excluded.reminder_hour,
            reminder_minute = excluded.reminder_minute,
            created_on = excluded.created_on,
            completed_days = excluded.completed_days,
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_reconciled_on = excluded.last_reconciled_on,
            checked_today = excluded.checked_today
        "#,
        params![
            habit.id.to_string(),
            habit.name,
            habit.goal,
            habit.color,
            habit.icon,
            habit.category,
            habit.frequency.label(),
            habit.scheduled_days.to_string(),
            habit.reminder.enabled,
            habit.reminder.hour,
            habit.reminder.minute,
            habit.created_on.to_string(),
            completed,
            habit.current_streak,
            habit.longest_streak,
            habit.last_reconciled_on.map(|d| d.to_string()),
            habit.checked_today,
        ],
    )?;
    Ok(())
}

/// Raw column values, decoded outside the SQLite callback so that a bad
/// date surfaces as a record error rather than a query error.
struct HabitRow {
    id: String,
    name: String,
    goal: String,
    color: u32,
    icon: String,
    category: String,
    frequency: String,
    scheduled_days: String,
    reminder_enabled: bool,
    reminder_hour: u8,
    reminder_minute: u8,
    created_on: String,
    completed_days: String,
    current_streak: u32,
    longest_streak: u32,
    last_reconciled_on: Option<String>,
    checked_today: bool,
}

impl HabitRow {
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            goal: row.get("goal")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            category: row.get("category")?,
            frequency: row.get("frequency")?,
            scheduled_days: row.get("scheduled_days")?,
            reminder_enabled: row.get("reminder_enabled")?,
            reminder_hour: row.get("reminder_hour")?,
            reminder_minute: row.get("reminder_minute")?,
            created_on: row.get("created_on")?,
            completed_days: row.get("completed_days")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_reconciled_on: row.get("last_reconciled_on")?,
            checked_today: row.get("checked_today")?,
        })
    }

    fn into_habit(self) -> StoreResult<Habit> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Corrupt(format!("habit id {:?}: {e}", self.id)))?;
        let scheduled_days: WeekdaySet = self
            .scheduled_days
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("scheduled days {:?}", self.scheduled_days)))?;
        let raw_days: Vec<String> = serde_json::from_str(&self.completed_days)?;
        let completed_days = raw_days
            .iter()
            .map(|d| CalendarDay::parse(d))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let last_reconciled_on = self
            .last_reconciled_on
            .as_deref()
            .map(CalendarDay::parse)
            .transpose()?;

        Ok(Habit {
            id,
            name: self.name,
            goal: self.goal,
            color: self.color,
            icon: self.icon,
            category: self.category,
            frequency: Frequency::from_label(Some(&self.frequency)),
            scheduled_days,
            reminder: Reminder {
                enabled: self.reminder_enabled,
                hour: self.reminder_hour,
                minute: self.reminder_minute,
            },
            created_on: CalendarDay::parse(&self.created_on)?,
            completed_days,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_reconciled_on,
            checked_today: self.checked_today,
        })
    }
}
