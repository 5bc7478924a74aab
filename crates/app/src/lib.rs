//! # thunderboard-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Transport`: open a GATT connection to a peripheral
//!   - `Connection`: read, write, subscribe and disconnect on that connection
//!   - `EventPublisher`: fan device events out to subscribers
//! - Define **driving/inbound** use-cases as service structs:
//!   - `ConnectionManager`: bounded-retry connect and scoped release
//!   - `read_device`: concurrent read of every characteristic group
//!   - `LightsController`: the RGB LED state machine
//!   - `NotificationHandler`: button notifications into the live snapshot
//!   - `ThunderboardService`: the facade a scheduler drives
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `thunderboard-domain` only (plus `tokio` for channels, timers
//! and joins). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
