//! # thunderboard-adapter-ble
//!
//! Connected-mode BLE adapter for the Thunderboard Sense 2, built on
//! btleplug.
//!
//! ## How it works
//!
//! [`BleTransport`] owns one host adapter. It scans for boards (by
//! Silicon Labs manufacturer id or `Thunder Sense` local name), connects,
//! discovers GATT services and hands out a [`BleConnection`] that reads,
//! writes and subscribes by registry [`CharacteristicId`].
//!
//! | Identifier | Resolved to |
//! |------------|-------------|
//! | `Uuid(u)` | first characteristic with UUID `u` |
//! | `Handle(28)` | Automation IO digital, notifying (buttons) |
//! | `Handle(33)` | Automation IO digital, non-notifying |
//!
//! Every GATT operation is bounded by `operation_timeout_secs`. Timeouts
//! and btleplug failures surface as [`TransportError`]s.
//!
//! ## Dependency rule
//!
//! Depends on `thunderboard-app` (ports) and `thunderboard-domain`.
//!
//! [`CharacteristicId`]: thunderboard_domain::registry::CharacteristicId
//! [`TransportError`]: thunderboard_domain::error::TransportError

mod config;
mod error;
mod gatt;
mod scanner;
mod transport;

pub use config::BleConfig;
pub use error::BleError;
pub use transport::{BleConnection, BleTransport};
