//! Habit Tracker - Track daily habits with streaks and completion history.

mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Config;
use habit_core::{
    CalendarDay, Frequency, HabitService, Reminder, SqliteStore, SystemClock, WeekdaySet,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "habit-tracker")]
#[command(about = "Track daily habits with streaks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file (overrides the configured path)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Habit attributes shared by `add` and `edit`.
#[derive(clap::Args, Debug, Default)]
pub struct HabitArgs {
    /// Goal description
    #[arg(long)]
    pub goal: Option<String>,

    /// daily, weekly or custom
    #[arg(long, value_parser = commands::parse_frequency)]
    pub frequency: Option<Frequency>,

    /// Scheduled weekdays for custom habits, e.g. Mon,Wed,Fri
    #[arg(long, value_name = "DAYS")]
    pub days: Option<WeekdaySet>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub icon: Option<String>,

    /// ARGB or RGB hex color, e.g. #4CAF50
    #[arg(long, value_name = "HEX", value_parser = commands::parse_color)]
    pub color: Option<u32>,

    /// Daily reminder time (HH:MM)
    #[arg(
        long,
        value_name = "HH:MM",
        value_parser = commands::parse_time,
        conflicts_with = "no_remind"
    )]
    pub remind: Option<Reminder>,

    /// Turn the reminder off
    #[arg(long)]
    pub no_remind: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List habits with today's status and streaks
    List,

    /// Create a habit
    Add {
        name: String,

        #[command(flatten)]
        details: HabitArgs,
    },

    /// Mark a habit complete (today unless --date is given)
    Check {
        /// Habit id or name
        habit: String,

        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<CalendarDay>,
    },

    /// Remove a completion (today unless --date is given)
    Uncheck {
        /// Habit id or name
        habit: String,

        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<CalendarDay>,
    },

    /// Change a habit's details
    Edit {
        /// Habit id or name
        habit: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        details: HabitArgs,
    },

    /// Delete a habit and its history
    Delete {
        /// Habit id or name
        habit: String,
    },

    /// Show statistics for all habits or one habit
    Stats {
        /// Habit id or name
        habit: Option<String>,

        /// Completion-rate window in days
        #[arg(long)]
        window: Option<u32>,
    },

    /// List habits still due today with reminders enabled
    Remind,

    /// Export habits as JSON
    Export {
        /// Output file; defaults to the configured export directory, else stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Import habits from a JSON export
    Import {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Replace all existing habits instead of merging
        #[arg(long)]
        replace: bool,
    },

    /// Write the current configuration to the config file
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(&config.tracking.log_level, cli.verbose);

    if let Command::Config = cli.command {
        return commands::write_config(&config);
    }

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.db_path())
        .context("Could not determine a database location; pass --db")?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let service = HabitService::new(Arc::new(store), Arc::new(SystemClock));

    service.reconcile_all().await?;

    let ctx = commands::Runner {
        service: &service,
        config: &config,
    };

    match cli.command {
        Command::List => ctx.list().await,
        Command::Add { name, details } => ctx.add(&name, details).await,
        Command::Check { habit, date } => ctx.set_completion(&habit, date, true).await,
        Command::Uncheck { habit, date } => ctx.set_completion(&habit, date, false).await,
        Command::Edit { habit, name, details } => ctx.edit(&habit, name, details).await,
        Command::Delete { habit } => ctx.delete(&habit).await,
        Command::Stats { habit, window } => ctx.stats(habit.as_deref(), window).await,
        Command::Remind => ctx.remind().await,
        Command::Export { output } => ctx.export(output).await,
        Command::Import { path, replace } => ctx.import(&path, replace).await,
        Command::Config => Ok(()),
    }
}

fn init_logging(configured: &str, verbose: u8) {
    const LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];

    let base = configured.parse::<Level>().unwrap_or(Level::WARN);
    let start = LEVELS.iter().position(|l| *l == base).unwrap_or(1);
    let level = LEVELS[(start + usize::from(verbose)).min(LEVELS.len() - 1)];

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
