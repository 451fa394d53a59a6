use crate::global;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channels: ChannelConfig,
    pub punctuality: PunctualityConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub notifications: NotificationConfig,
}

/// Channel identifiers on the chat platform.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Voice channel whose joins are tracked
    pub monitored_channel_id: u64,
    /// Text channel that receives reminders and lateness notices
    pub announcement_channel_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PunctualityConfig {
    /// How long before a scheduled start reminders are posted
    pub reminder_threshold_minutes: u32,
    /// Minutes after the start that still count as on time
    pub grace_period_minutes: u32,
    /// Fee charged per late minute
    pub fee_per_minute: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_seconds: u64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file. Defaults to the per-user data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
    /// Prefix for chat text commands, e.g. `!schedule 5`
    pub command_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Endpoint that relays messages to the chat platform.
    /// Notifications are only logged when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for PunctualityConfig {
    fn default() -> Self {
        Self {
            reminder_threshold_minutes: 15,
            grace_period_minutes: 1,
            fee_per_minute: 200.0,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 60,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3838,
            command_prefix: "!".to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&global::config_file()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let fee = self.punctuality.fee_per_minute;
        if !fee.is_finite() || fee < 0.0 {
            bail!("punctuality.fee_per_minute must be a non-negative number, got {fee}");
        }
        if self.scheduler.tick_interval_seconds == 0 {
            bail!("scheduler.tick_interval_seconds must be at least 1");
        }
        if self.api.port == 0 {
            bail!("api.port must be non-zero");
        }
        if self.api.command_prefix.trim().is_empty() {
            bail!("api.command_prefix must not be empty");
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => global::db_file(),
        }
    }

    pub fn service_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_configuration() {
        let config = Config::default();
        assert_eq!(config.punctuality.reminder_threshold_minutes, 15);
        assert_eq!(config.punctuality.grace_period_minutes, 1);
        assert_eq!(config.punctuality.fee_per_minute, 200.0);
        assert_eq!(config.scheduler.tick_interval_seconds, 60);
        assert_eq!(config.api.command_prefix, "!");
        assert!(config.notifications.webhook_url.is_none());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [channels]
            monitored_channel_id = 42
            announcement_channel_id = 7

            [punctuality]
            fee_per_minute = 50.5
            "#,
        )
        .unwrap();

        assert_eq!(config.channels.monitored_channel_id, 42);
        assert_eq!(config.channels.announcement_channel_id, 7);
        assert_eq!(config.punctuality.fee_per_minute, 50.5);
        assert_eq!(config.punctuality.grace_period_minutes, 1);
        assert_eq!(config.api.port, 3838);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.punctuality.reminder_threshold_minutes, 15);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api.port, config.api.port);
    }

    #[test]
    fn test_load_from_rejects_negative_fee() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[punctuality]\nfee_per_minute = -1.0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("fee_per_minute"));
    }

    #[test]
    fn test_validate_rejects_zero_tick_interval() {
        let mut config = Config::default();
        config.scheduler.tick_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_prefix() {
        let mut config = Config::default();
        config.api.command_prefix = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_override() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/tmp/rollcall-test.db"));
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/rollcall-test.db")
        );
    }
}
