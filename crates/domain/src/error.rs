//! Common error types used across the workspace.
//!
//! Each layer defines typed errors and converts via `#[from]`. Adapters wrap
//! their native failures in a [`TransportError`] so the application layer
//! never sees a BLE stack type.

use std::time::Duration;

/// Top-level error for every driver operation.
#[derive(Debug, thiserror::Error)]
pub enum ThunderboardError {
    /// Every connection attempt to the peripheral failed.
    #[error("failed to connect to {address} after {attempts} attempt(s)")]
    ConnectionFailed {
        /// Address of the peripheral.
        address: String,
        /// Number of attempts that were made.
        attempts: u32,
        /// The error reported by the last attempt, if any.
        #[source]
        last: Option<TransportError>,
    },

    /// A read, write, subscribe or disconnect failed mid-session.
    #[error("transport error")]
    Transport(#[from] TransportError),

    /// A payload did not match the characteristic's wire format.
    #[error("invalid payload")]
    Payload(#[from] PayloadError),

    /// A lookup in one of the static tables failed.
    #[error("registry lookup failed")]
    Registry(#[from] RegistryError),

    /// A light command could not be written; the previous state is kept.
    #[error("failed to write light state")]
    WriteFailed(#[source] TransportError),

    /// The operation needs a session that is kept open between cycles.
    #[error("no connected session available")]
    NotConnected,
}

/// Failure reported by the transport collaborator.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed")]
pub struct TransportError {
    /// What was being attempted (e.g. `"read 00002a19-…"`).
    pub operation: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    /// Wrap any error raised while performing `operation`.
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// The operation did not complete within `duration`.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::new(operation, TimeoutError { duration })
    }
}

/// Marker source for operations cut off by a deadline.
#[derive(Debug, thiserror::Error)]
#[error("timed out after {duration:?}")]
pub struct TimeoutError {
    pub duration: Duration,
}

/// Details about why a characteristic payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload length does not match the expected width of the format.
    #[error("{format} payload must be {expected} bytes, got {actual}")]
    MalformedPayload {
        /// Format name (e.g. `"u16 LE"`).
        format: &'static str,
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// A raw code has no entry in the characteristic's remap table.
    #[error("unmapped code {code}")]
    UnmappedCode {
        /// The raw decoded value.
        code: i64,
    },

    /// A value does not fit in the format it is being encoded into.
    #[error("value {value} does not fit in {format}")]
    OutOfRange {
        /// Format name.
        format: &'static str,
        /// The value that was rejected.
        value: i64,
    },

    /// A string characteristic was handed to a numeric decoder.
    #[error("{format} payload has no numeric value")]
    NotNumeric {
        /// Format name.
        format: &'static str,
    },

    /// A light payload carried a mode outside the 16 known bitmasks.
    #[error("invalid light mode {mode}")]
    InvalidMode {
        /// The raw mode byte.
        mode: u8,
    },
}

/// A static table was queried with something it does not contain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No descriptor is registered for this key.
    #[error("unknown characteristic key {0}")]
    UnknownKey(&'static str),

    /// No mode code lights exactly this set of LEDs.
    #[error("no light mode for LEDs {0:?}")]
    UnknownLedSet(Vec<u8>),
}

/// Render an error and its chain of sources on one line, `outer: inner`.
#[must_use]
pub fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
