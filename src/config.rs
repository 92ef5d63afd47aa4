//! TOML configuration for the subscriber client
//!
//! Credentials are referenced by environment variable name and resolved at
//! connect time, never stored in the config file itself.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level subscriber configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriberConfig {
    pub broker: BrokerSection,
    pub telemetry: TelemetrySection,
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub export: ExportSection,
}

/// Broker endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerSection {
    /// Broker URL with scheme and port, e.g. `mqtt://192.168.11.104:1883`.
    /// The `mqtts` scheme enables TLS.
    pub url: String,
    /// Environment variable containing the username.
    pub username_env: Option<String>,
    /// Environment variable containing the password.
    pub password_env: Option<String>,
    /// How long to wait for the broker to acknowledge a connect.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl BrokerSection {
    /// Resolve the broker username from the configured environment variable.
    pub fn username(&self) -> Option<String> {
        resolve_env(self.username_env.as_ref())
    }

    /// Resolve the broker password from the configured environment variable.
    pub fn password(&self) -> Option<String> {
        resolve_env(self.password_env.as_ref())
    }
}

/// Telemetry subscription settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySection {
    /// The single topic the gateway publishes device telemetry on.
    pub topic: String,
    /// Print each ingested device batch to the console.
    #[serde(default = "default_display_live")]
    pub display_live: bool,
}

fn default_display_live() -> bool {
    true
}

/// Connection retry and watchdog settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    /// Initial connect attempts before giving up (fatal).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff unit: after failed attempt N, wait N of these.
    #[serde(default = "default_backoff_unit_secs")]
    pub backoff_unit_secs: u64,
    /// Watchdog poll interval for detecting a dropped connection.
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_unit_secs() -> u64 {
    1
}

fn default_watchdog_interval_secs() -> u64 {
    1
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_secs: default_backoff_unit_secs(),
            watchdog_interval_secs: default_watchdog_interval_secs(),
        }
    }
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportSection {
    /// Destination file for the selected device rows. Overwritten per export.
    #[serde(default = "default_export_path")]
    pub path: String,
}

fn default_export_path() -> String {
    "sensors_temp.csv".to_string()
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            path: default_export_path(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SubscriberConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: SubscriberConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.topic.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "telemetry.topic must not be empty".to_string(),
            ));
        }
        if self.connection.max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "connection.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_env(env_var_name: Option<&String>) -> Option<String> {
    env_var_name.and_then(|name| std::env::var(name).ok())
}

#[cfg(test)]
pub(crate) fn test_config() -> SubscriberConfig {
    toml::from_str(
        r#"
[broker]
url = "mqtt://localhost:1883"

[telemetry]
topic = "/test"
"#,
    )
    .expect("test config should parse")
}
