//! Device snapshot: everything one update cycle learned about the board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::button::DigitalDelta;
use crate::key::{DeviceInfoKey, DigitalKey, SensorKey};
use crate::lights::LightsState;
use crate::registry::PRODUCT_NAME;
use crate::time::{Timestamp, now};
use crate::value::{DigitalValue, SensorValue};

/// RSSI reported when the peripheral reference carries none.
pub const UNKNOWN_RSSI: i16 = -255;

/// A reference to a discovered peripheral, handed in by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralRef {
    /// BLE MAC address (or platform identifier on macOS).
    pub address: String,
    /// Advertised local name, if known.
    pub name: Option<String>,
    /// Last known signal strength in dBm.
    pub rssi: Option<i16>,
}

impl PeripheralRef {
    /// A reference known only by its address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            rssi: None,
        }
    }
}

/// Result of one update cycle.
///
/// A snapshot is always returned, even when reads failed: check per-field
/// presence, and [`error`](Self::error) for the first failure seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub manufacturer: String,
    pub hardware_revision: String,
    pub firmware_revision: String,
    pub model: Option<String>,
    pub name: String,
    pub identifier: String,
    pub address: String,
    pub sensors: BTreeMap<SensorKey, SensorValue>,
    pub digitals: BTreeMap<DigitalKey, DigitalValue>,
    pub lights: Option<LightsState>,
    pub rssi: i16,
    pub error: Option<String>,
    pub updated_at: Timestamp,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        Self {
            manufacturer: String::new(),
            hardware_revision: String::new(),
            firmware_revision: String::new(),
            model: None,
            name: String::new(),
            identifier: String::new(),
            address: String::new(),
            sensors: BTreeMap::new(),
            digitals: BTreeMap::new(),
            lights: None,
            rssi: UNKNOWN_RSSI,
            error: None,
            updated_at: now(),
        }
    }
}

impl DeviceSnapshot {
    /// Fresh snapshot for a cycle against `peripheral`.
    ///
    /// The advertised name, when known, becomes the identifier.
    #[must_use]
    pub fn for_peripheral(peripheral: &PeripheralRef) -> Self {
        Self {
            identifier: peripheral.name.clone().unwrap_or_default(),
            address: peripheral.address.clone(),
            rssi: peripheral.rssi.unwrap_or(UNKNOWN_RSSI),
            ..Self::default()
        }
    }

    /// Generated name used when the board reports an empty device name.
    #[must_use]
    pub fn friendly_name(&self) -> String {
        match &self.model {
            Some(model) => format!("{PRODUCT_NAME} {model}"),
            None => PRODUCT_NAME.to_owned(),
        }
    }

    /// Assign an identity string to the field named by `key`.
    pub fn set_identity(&mut self, key: DeviceInfoKey, value: String) {
        match key {
            DeviceInfoKey::Name => self.name = value,
            DeviceInfoKey::Model => self.model = Some(value),
            DeviceInfoKey::HardwareRevision => self.hardware_revision = value,
            DeviceInfoKey::FirmwareRevision => self.firmware_revision = value,
            DeviceInfoKey::Manufacturer => self.manufacturer = value,
        }
    }

    /// Overwrite the digital values present in `delta`, leaving others alone.
    pub fn merge_digitals(&mut self, delta: DigitalDelta) {
        self.digitals.extend(delta);
    }

    /// Overwrite the sensor values present in `values`, leaving others alone.
    pub fn merge_sensors(&mut self, values: BTreeMap<SensorKey, SensorValue>) {
        self.sensors.extend(values);
    }

    /// Record a failure; only the first one is kept.
    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    /// Boolean state of a button, if it was reported.
    #[must_use]
    pub fn button(&self, key: DigitalKey) -> Option<bool> {
        match self.digitals.get(&key) {
            Some(DigitalValue::Bool(pressed)) => Some(*pressed),
            _ => None,
        }
    }
}
