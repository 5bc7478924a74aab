//! Device events, published whenever something observable about the board
//! changes.

use serde::{Deserialize, Serialize};

use crate::button::DigitalDelta;
use crate::device::DeviceSnapshot;
use crate::lights::LightsState;
use crate::time::{Timestamp, now};

/// Something that happened to the device, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// An update cycle finished (possibly degraded, see `snapshot.error`).
    SnapshotUpdated { snapshot: Box<DeviceSnapshot> },

    /// A button notification changed the digital state.
    ButtonsChanged {
        address: String,
        digitals: DigitalDelta,
        at: Timestamp,
    },

    /// A light command was written to the peripheral.
    LightsChanged {
        address: String,
        state: LightsState,
        at: Timestamp,
    },
}

impl DeviceEvent {
    #[must_use]
    pub fn buttons_changed(address: impl Into<String>, digitals: DigitalDelta) -> Self {
        Self::ButtonsChanged {
            address: address.into(),
            digitals,
            at: now(),
        }
    }

    #[must_use]
    pub fn lights_changed(address: impl Into<String>, state: LightsState) -> Self {
        Self::LightsChanged {
            address: address.into(),
            state,
            at: now(),
        }
    }

    /// Address of the peripheral the event is about.
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::SnapshotUpdated { snapshot } => &snapshot.address,
            Self::ButtonsChanged { address, .. } | Self::LightsChanged { address, .. } => address,
        }
    }
}
