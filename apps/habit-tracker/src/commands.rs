//! Subcommand handlers.

use crate::config::Config;
use crate::HabitArgs;
use anyhow::{bail, Context as _};
use chrono::Local;
use habit_core::stats;
use habit_core::{
    CalendarDay, Frequency, Habit, HabitEdit, HabitId, HabitService, ImportMode, Reminder,
    SqliteStore,
};
use std::path::{Path, PathBuf};

/// Parse `HH:MM` into an enabled reminder.
pub fn parse_time(s: &str) -> Result<Reminder, String> {
    let (h, m) = s.split_once(':').ok_or_else(|| format!("expected HH:MM, got {s:?}"))?;
    let hour: u8 = h.trim().parse().map_err(|_| format!("invalid hour {h:?}"))?;
    let minute: u8 = m.trim().parse().map_err(|_| format!("invalid minute {m:?}"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{s:?} is not a time of day"));
    }
    Ok(Reminder::at(hour, minute))
}

/// Parse `#RRGGBB`, `RRGGBB` or `AARRGGBB`; six-digit colors are opaque.
pub fn parse_color(s: &str) -> Result<u32, String> {
    let hex = s.trim().trim_start_matches('#');
    let value = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex color {s:?}"))?;
    match hex.len() {
        6 => Ok(0xFF00_0000 | value),
        8 => Ok(value),
        _ => Err(format!("expected 6 or 8 hex digits, got {s:?}")),
    }
}

pub fn parse_frequency(s: &str) -> Result<Frequency, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "daily" => Ok(Frequency::Daily),
        "weekly" => Ok(Frequency::Weekly),
        "custom" => Ok(Frequency::Custom),
        _ => Err(format!("unknown frequency {s:?} (daily, weekly, custom)")),
    }
}

pub fn write_config(config: &Config) -> anyhow::Result<()> {
    config.save()?;
    match Config::config_path() {
        Some(path) => println!("Wrote {}", path.display()),
        None => bail!("No configuration directory available"),
    }
    Ok(())
}

/// Runs subcommands against an open service.
pub struct Runner<'a> {
    pub service: &'a HabitService<SqliteStore>,
    pub config: &'a Config,
}

impl Runner<'_> {
    async fn resolve(&self, key: &str) -> anyhow::Result<Habit> {
        if let Ok(id) = HabitId::parse_str(key) {
            return Ok(self.service.get(id).await?);
        }

        let mut matches: Vec<Habit> = self
            .service
            .list()
            .await?
            .into_iter()
            .filter(|h| h.name().eq_ignore_ascii_case(key.trim()))
            .collect();
        match matches.len() {
            0 => bail!("No habit named {key:?}"),
            1 => Ok(matches.remove(0)),
            n => bail!("{n} habits are named {key:?}; use the id instead"),
        }
    }

    pub async fn list(&self) -> anyhow::Result<()> {
        let today = self.service.today();
        let window = self.config.tracking.completion_window_days;
        let habits = self.service.list().await?;
        if habits.is_empty() {
            println!("No habits yet. Add one with `habit-tracker add <NAME>`.");
            return Ok(());
        }

        for habit in &habits {
            let mark = if habit.is_completed_on(today) { "[x]" } else { "[ ]" };
            let due = if habit_core::schedule::is_active_on(habit, today) {
                ""
            } else {
                " (not due)"
            };
            println!(
                "{mark} {:<24} streak {:>3}  best {:>3}  {:>3}%  {}{due}",
                habit.name(),
                habit.current_streak(),
                habit.longest_streak(),
                habit.completion_rate(today, window),
                habit.frequency,
            );
        }
        Ok(())
    }

    pub async fn add(&self, name: &str, details: HabitArgs) -> anyhow::Result<()> {
        let mut habit = Habit::new(name, self.service.today())?;
        habit.apply(edit_from(None, details))?;
        let habit = self.service.create(habit).await?;
        println!("Added {} ({})", habit.name(), habit.id());
        Ok(())
    }

    pub async fn set_completion(
        &self,
        key: &str,
        date: Option<CalendarDay>,
        completed: bool,
    ) -> anyhow::Result<()> {
        let habit = self.resolve(key).await?;
        let day = date.unwrap_or_else(|| self.service.today());
        let habit = self.service.set_completion(habit.id(), day, completed).await?;
        let verb = if completed { "Checked" } else { "Unchecked" };
        println!(
            "{verb} {} on {day}: streak {}, best {}",
            habit.name(),
            habit.current_streak(),
            habit.longest_streak()
        );
        Ok(())
    }

    pub async fn edit(
        &self,
        key: &str,
        name: Option<String>,
        details: HabitArgs,
    ) -> anyhow::Result<()> {
        let habit = self.resolve(key).await?;
        let edit = edit_from(name, details);
        if edit.is_empty() {
            bail!("Nothing to change");
        }
        let habit = self.service.edit(habit.id(), edit).await?;
        println!("Updated {}", habit.name());
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let habit = self.resolve(key).await?;
        self.service.delete(habit.id()).await?;
        println!("Deleted {}", habit.name());
        Ok(())
    }

    pub async fn stats(&self, key: Option<&str>, window: Option<u32>) -> anyhow::Result<()> {
        let window = window.unwrap_or(self.config.tracking.completion_window_days);

        if let Some(key) = key {
            let habit = self.resolve(key).await?;
            let summary = self.service.summary(habit.id(), window).await?;
            println!("{}", habit.name());
            println!("  current streak   {}", summary.streaks.current);
            println!("  longest streak   {}", summary.streaks.longest);
            println!("  last {window} days    {}%", summary.completion_rate);
            println!(
                "  due days done    {}/{} ({}%)",
                summary.completed_active_days,
                summary.active_days,
                summary.adherence()
            );
            println!("  reminder         {}", habit.reminder);
            return Ok(());
        }

        let today = self.service.today();
        let overview = self.service.overview().await?;
        println!("Habits            {}", overview.total_habits);
        println!("Completed today   {}/{}", overview.completed_today, overview.total_habits);
        println!("Best streak       {}", overview.best_current_streak);
        println!("Longest streak    {}", overview.best_longest_streak);
        println!("Success rate      {}%", overview.success_rate);
        println!("Weekly average    {}", overview.weekly_average);

        let habits = self.service.list().await?;
        let week = stats::week_completions(&habits, today);
        println!();
        let labels = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        let week: Vec<String> = labels
            .iter()
            .zip(week)
            .map(|(label, count)| format!("{label} {count}"))
            .collect();
        println!("This week         {}", week.join(" "));

        println!();
        for (day, count) in stats::daily_completions(&habits, today, 30) {
            println!("{day} {}", "#".repeat(count));
        }
        Ok(())
    }

    pub async fn remind(&self) -> anyhow::Result<()> {
        let due = self.service.due_reminders().await?;
        if !self.config.notifications.incomplete_warning {
            tracing::debug!(count = due.len(), "incomplete warnings disabled");
            return Ok(());
        }
        if due.is_empty() {
            println!("All habits done for today.");
            return Ok(());
        }
        for habit in due {
            println!("{} {} ({})", habit.reminder, habit.name(), habit.goal);
        }
        Ok(())
    }

    pub async fn export(&self, output: Option<PathBuf>) -> anyhow::Result<()> {
        let now = Local::now().naive_local();
        let json = self.service.export_json(now).await?;

        let target = output.or_else(|| {
            self.config
                .export
                .path
                .as_ref()
                .map(|dir| dir.join(format!("habits_export_{}.json", now.format("%Y%m%d_%H%M%S"))))
        });
        match target {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Exported to {}", path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }

    pub async fn import(&self, path: &Path, replace: bool) -> anyhow::Result<()> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mode = if replace { ImportMode::Replace } else { ImportMode::Merge };
        let report = self.service.import_json(&json, mode).await?;

        println!("Imported {} habit(s)", report.imported.len());
        if report.removed > 0 {
            println!("Replaced {} existing habit(s)", report.removed);
        }
        for skipped in &report.skipped {
            println!("Skipped record {}: {}", skipped.index, skipped.reason);
        }
        Ok(())
    }
}

fn edit_from(name: Option<String>, details: HabitArgs) -> HabitEdit {
    // Weekdays alone imply a custom schedule.
    let frequency = match (details.frequency, &details.days) {
        (None, Some(_)) => Some(Frequency::Custom),
        (frequency, _) => frequency,
    };
    let reminder = if details.no_remind {
        Some(Reminder::disabled())
    } else {
        details.remind
    };

    HabitEdit {
        name,
        goal: details.goal,
        color: details.color,
        icon: details.icon,
        category: details.category,
        frequency,
        scheduled_days: details.days,
        reminder,
    }
}
