//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the btleplug transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Index of the host adapter to use, in the order the OS reports them.
    pub adapter_index: usize,
    /// Budget for a single GATT read or write, in seconds.
    pub operation_timeout_secs: u16,
    /// How long to scan for an advertisement before giving up, in seconds.
    pub discovery_timeout_secs: u16,
}

impl BleConfig {
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.operation_timeout_secs))
    }

    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.discovery_timeout_secs))
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            operation_timeout_secs: 10,
            discovery_timeout_secs: 30,
        }
    }
}
