//! Closed key enumerations used to address readings in a snapshot.
//!
//! Every characteristic the driver knows about is named by one of these keys.
//! Each key has a stable snake_case wire name used for serialisation and logs.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! wire_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stable snake_case name of this key.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Numeric or textual sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKey {
    Battery,
    PowerSource,
    Temperature,
    Humidity,
    Pressure,
    #[serde(rename = "uv_idx")]
    UvIndex,
    SoundLevel,
    AmbientLight,
    HallFieldStrength,
}

wire_names!(SensorKey {
    Battery => "battery",
    PowerSource => "power_source",
    Temperature => "temperature",
    Humidity => "humidity",
    Pressure => "pressure",
    UvIndex => "uv_idx",
    SoundLevel => "sound_level",
    AmbientLight => "ambient_light",
    HallFieldStrength => "hall_field_strength",
});

/// Automation-IO digital states and the buttons derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalKey {
    #[serde(rename = "digital_state_0")]
    DigitalState0,
    #[serde(rename = "digital_state_1")]
    DigitalState1,
    #[serde(rename = "btn_0")]
    Btn0,
    #[serde(rename = "btn_1")]
    Btn1,
}

wire_names!(DigitalKey {
    DigitalState0 => "digital_state_0",
    DigitalState1 => "digital_state_1",
    Btn0 => "btn_0",
    Btn1 => "btn_1",
});

/// Identity strings from the Generic Access and Device Information services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceInfoKey {
    Name,
    Model,
    #[serde(rename = "hw_version")]
    HardwareRevision,
    #[serde(rename = "sw_version")]
    FirmwareRevision,
    Manufacturer,
}

wire_names!(DeviceInfoKey {
    Name => "name",
    Model => "model",
    HardwareRevision => "hw_version",
    FirmwareRevision => "sw_version",
    Manufacturer => "manufacturer",
});

/// Controllable lights on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKey {
    #[serde(rename = "rgb_leds_1")]
    RgbLeds1,
}

wire_names!(LightKey {
    RgbLeds1 => "rgb_leds_1",
});
