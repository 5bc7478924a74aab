//! # thunderboard-domain
//!
//! Pure domain model for the Thunderboard Sense 2 BLE driver.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps, closed key enums
//! - The board's **characteristic registry** (UUIDs, formats, dividers, remaps)
//! - The **binary codec** turning payloads into typed readings
//! - The **lighting sub-protocol** (mode bitmask, HSV brightness scaling)
//! - **Button decoding** for digital-state notifications
//! - The **device snapshot** produced by each update cycle
//! - **Device events** published to subscribers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod button;
pub mod codec;
pub mod device;
pub mod event;
pub mod key;
pub mod lights;
pub mod registry;
pub mod value;
