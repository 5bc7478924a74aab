//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `thunderboard.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use serde::Deserialize;

use thunderboard_adapter_ble::BleConfig;
use thunderboard_app::services::UpdateOptions;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which board to drive and how to poll it.
    pub device: DeviceConfig,
    /// Host adapter settings.
    pub ble: BleConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Board selection and polling behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// MAC address of the board. When unset, the first Thunderboard
    /// advertising is adopted.
    pub address: Option<String>,
    /// Seconds between two update cycles.
    pub scan_interval_secs: u64,
    /// Keep the GATT session open between cycles.
    pub keep_connected: bool,
    /// Budget of one connection attempt, in seconds.
    pub scan_timeout_secs: u64,
    /// Connection attempts per cycle.
    pub max_connection_attempts: u32,
    /// Subscribe to button presses while connected.
    pub button_notifications: bool,
    /// Minimum seconds between two refreshes triggered by button presses.
    pub event_debounce_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `thunderboard.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("thunderboard.toml")?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("THUNDERBOARD_ADDRESS") {
            self.device.address = Some(val).filter(|address| !address.is_empty());
        }
        if let Some(interval) = var("THUNDERBOARD_SCAN_INTERVAL").and_then(|v| v.parse().ok()) {
            self.device.scan_interval_secs = interval;
        }
        if let Some(keep) = var("THUNDERBOARD_KEEP_CONNECTED").and_then(|v| parse_bool(&v)) {
            self.device.keep_connected = keep;
        }
        if let Some(val) = var("THUNDERBOARD_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(address) = &self.device.address {
            if !is_mac_address(address) {
                return Err(ConfigError::Validation(format!(
                    "address {address:?} is not a MAC address"
                )));
            }
        }
        if self.device.scan_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scan_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.device.max_connection_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_connection_attempts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    #[must_use]
    pub fn event_debounce(&self) -> Duration {
        Duration::from_secs(self.event_debounce_secs)
    }

    /// Options handed to every update cycle.
    #[must_use]
    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions {
            keep_connected: self.keep_connected,
            attempt_timeout: Duration::from_secs(self.scan_timeout_secs),
            max_attempts: self.max_connection_attempts,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn is_mac_address(value: &str) -> bool {
    let octets: Vec<&str> = value.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|octet| octet.len() == 2 && octet.chars().all(|c| c.is_ascii_hexdigit()))
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            scan_interval_secs: 20,
            keep_connected: true,
            scan_timeout_secs: 30,
            max_connection_attempts: 3,
            button_notifications: true,
            event_debounce_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "thunderboardd=info,thunderboard=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
