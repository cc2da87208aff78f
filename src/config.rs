//! Configuration for USB Sentry.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::notify::EmailConfig;

/// Main configuration for the monitor.
///
/// The allow-list path is a CLI argument, not configuration: it names the
/// data being monitored rather than how to monitor it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between poll passes
    pub poll_interval_secs: u64,

    /// Path of the unauthorized-device event log
    pub event_log_path: PathBuf,

    /// SMTP settings for email alerts; alerts are log-only when absent
    pub email: Option<EmailConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("usb-sentry");

        Self {
            poll_interval_secs: 5,
            event_log_path: data_dir.join("unauthorized_usb_log.csv"),
            email: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; an unparseable file is an error,
    /// since it may be hiding the alerting settings the operator expects.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("usb-sentry")
            .join("config.json")
    }

    /// Ensure the event log's directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.event_log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::IoError(e.to_string()))?;
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert!(config.email.is_none());
        assert!(config
            .event_log_path
            .to_string_lossy()
            .contains("unauthorized_usb_log"));
    }

    // XDG_CONFIG_HOME redirects `config_path` on Linux only.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_save_then_load_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_CONFIG_HOME", dir.path());

        let mut config = Config::default();
        config.poll_interval_secs = 45;
        config.save().unwrap();

        assert!(Config::config_path().starts_with(dir.path()));
        let loaded = Config::load().unwrap();
        assert_eq!(loaded.poll_interval_secs, 45);
        assert!(loaded.email.is_none());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let mut config = Config::default();
        config.poll_interval_secs = 30;
        config.email = Some(EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender_email: "sentry@example.com".to_string(),
            sender_password: "secret".to_string(),
            recipient_email: "security@example.com".to_string(),
        });

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.poll_interval_secs, 30);
        assert_eq!(parsed.email.unwrap().smtp_server, "smtp.example.com");
    }
}
