//! Configuration for habit tracker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Tracking settings.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from default path.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save configuration to default path.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    /// Get configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "habit-tracker")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Database path: the configured override, else the data directory.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.storage.db_path.clone().or_else(|| {
            directories::ProjectDirs::from("", "", "habit-tracker")
                .map(|d| d.data_dir().join("habits.db"))
        })
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; defaults to the platform data directory.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Window for completion rates, in days.
    #[serde(default = "default_window")]
    pub completion_window_days: u32,
    /// Log level filter (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            completion_window_days: default_window(),
            log_level: default_log_level(),
        }
    }
}

fn default_window() -> u32 {
    7
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Warn about incomplete habits.
    #[serde(default = "default_true")]
    pub incomplete_warning: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            incomplete_warning: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
