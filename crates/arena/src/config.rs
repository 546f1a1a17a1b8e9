//! Configuration management for the arena observer.
//!
//! This module handles loading, validation, and conversion of configuration
//! from TOML files, environment variables and command-line arguments.

use arena_client::config::{
    API_URL_ENV, DEFAULT_API_BASE_URL, DEFAULT_PARTICIPANT, DEFAULT_WS_BASE_URL, PARTICIPANT_ENV,
    WS_URL_ENV,
};
use arena_client::{ApiConfig, BackoffPolicy, ClientConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write default configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_ws_url() -> String {
    DEFAULT_WS_BASE_URL.to_string()
}

fn default_participant() -> String {
    DEFAULT_PARTICIPANT.to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_attempt_timeout_ms() -> u64 {
    8000
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_backoff_max_ms() -> u64 {
    10_000
}

fn default_api_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Live connection settings
    #[serde(default)]
    pub connection: ConnectionSettings,
    /// REST API settings
    #[serde(default)]
    pub api: ApiSettings,
    /// Polling fallback settings
    #[serde(default)]
    pub sync: SyncSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Live connection settings.
///
/// Controls the endpoint, the attempt bound and timeout, and the backoff schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// WebSocket base address (e.g., "ws://localhost:8006")
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Participant token appended to the endpoint path
    #[serde(default = "default_participant")]
    pub participant: String,
    /// Maximum number of open attempts per connect cycle
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Timeout of a single open attempt in milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Delay before the first retry in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Growth factor applied to the delay after each failure
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound of the retry delay in milliseconds
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Server close codes that end the session instead of reconnecting
    #[serde(default)]
    pub terminal_close_codes: Vec<u16>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            participant: default_participant(),
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            backoff_max_ms: default_backoff_max_ms(),
            terminal_close_codes: Vec::new(),
        }
    }
}

/// REST API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// REST API base address (e.g., "http://localhost:8006")
    #[serde(default = "default_api_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

/// Polling fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between REST polls while the live connection is down, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating a default file if it doesn't exist.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies `ARENA_WS_URL`, `ARENA_API_URL` and `ARENA_PARTICIPANT`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = value(WS_URL_ENV) {
            self.connection.ws_url = url;
        }
        if let Some(url) = value(API_URL_ENV) {
            self.api.base_url = url;
        }
        if let Some(participant) = value(PARTICIPANT_ENV) {
            self.connection.participant = participant;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ws_url = &self.connection.ws_url;
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "connection.ws_url must start with ws:// or wss://: {ws_url}"
            )));
        }

        if self.connection.participant.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "connection.participant cannot be empty".to_string(),
            ));
        }

        if self.connection.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "connection.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.connection.attempt_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connection.attempt_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !self.connection.backoff_multiplier.is_finite() || self.connection.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "connection.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.connection.backoff_base_ms > self.connection.backoff_max_ms {
            return Err(ConfigError::Invalid(
                "connection.backoff_base_ms must not exceed connection.backoff_max_ms".to_string(),
            ));
        }

        let api_url = &self.api.base_url;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must start with http:// or https://: {api_url}"
            )));
        }

        if self.sync.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            )));
        }

        Ok(())
    }

    pub fn to_client_config(&self) -> ClientConfig {
        let connection = &self.connection;
        ClientConfig::default()
            .with_ws_base_url(connection.ws_url.clone())
            .with_participant(connection.participant.clone())
            .with_max_attempts(connection.max_attempts)
            .with_attempt_timeout(Duration::from_millis(connection.attempt_timeout_ms))
            .with_backoff(BackoffPolicy::new(
                Duration::from_millis(connection.backoff_base_ms),
                connection.backoff_multiplier,
                Duration::from_millis(connection.backoff_max_ms),
            ))
            .with_terminal_close_codes(connection.terminal_close_codes.clone())
    }

    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: Duration::from_millis(self.sync.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.connection.ws_url, "ws://localhost:8006");
        assert_eq!(config.connection.participant, "observer");
        assert_eq!(config.connection.max_attempts, 5);
        assert_eq!(config.connection.attempt_timeout_ms, 8000);
        assert!(config.connection.terminal_close_codes.is_empty());

        assert_eq!(config.api.base_url, "http://localhost:8006");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.sync.poll_interval_ms, 5000);

        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_conversions_match_client_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.to_client_config(), ClientConfig::default());
        assert_eq!(config.to_api_config(), ApiConfig::default());
        assert_eq!(config.to_sync_config(), SyncConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.connection.ws_url = "http://localhost:8006".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.connection.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.connection.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.connection.backoff_base_ms = 20_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.base_url = "localhost:8006".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sync.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (WS_URL_ENV, "wss://arena.example.com"),
            (API_URL_ENV, "https://arena.example.com"),
            (PARTICIPANT_ENV, "   "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.connection.ws_url, "wss://arena.example.com");
        assert_eq!(config.api.base_url, "https://arena.example.com");
        // Blank values are ignored
        assert_eq!(config.connection.participant, "observer");
    }

    #[tokio::test]
    async fn test_load_partial_config_file() {
        let toml_content = r#"
[connection]
ws_url = "ws://10.0.0.5:8006"
max_attempts = 3
terminal_close_codes = [4004]

[sync]
poll_interval_ms = 2000

[logging]
level = "debug"
json_format = true
"#;
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.connection.ws_url, "ws://10.0.0.5:8006");
        assert_eq!(config.connection.max_attempts, 3);
        assert_eq!(config.connection.terminal_close_codes, vec![4004]);
        assert_eq!(config.connection.participant, "observer");
        assert_eq!(config.api, ApiSettings::default());
        assert_eq!(config.sync.poll_interval_ms, 2000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);

        let client = config.to_client_config();
        assert_eq!(client.max_attempts, 3);
        assert_eq!(client.endpoint_url("g1"), "ws://10.0.0.5:8006/ws/g1/observer");
    }

    #[tokio::test]
    async fn test_missing_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[connection\nws_url = ").await.unwrap();

        let result = AppConfig::load_from_file(&temp_file.path().to_path_buf()).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
