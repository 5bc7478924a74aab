//! Characteristic registry: the board's fixed GATT table.
//!
//! UUIDs come from the Thunderboard Sense 2 SoC demo GATT definition. The two
//! Automation IO digital characteristics share UUID `0x2A56`, so they are
//! addressed by attribute handle instead.
//!
//! | Key | UUID / handle | Format | Divider |
//! |-----|---------------|--------|---------|
//! | battery | `0x2A19` | u8 | - |
//! | power source | `ec61a454-…` | u8, remapped | - |
//! | temperature | `0x2A6E` | i16 LE | 100 |
//! | humidity | `0x2A6F` | u16 LE | 100 |
//! | pressure | `0x2A6D` | u32 LE | 10 |
//! | UV index | `0x2A76` | u8 | - |
//! | sound level | `c8546913-bf02-…` | i16 LE | 100 |
//! | ambient light | `c8546913-bfd9-…` | u32 LE | 100 |
//! | hall field | `f598dbc5-2f02-…` | i32 LE | - |
//! | RGB LEDs | `fcb89c40-…` | 4 x u8 | - |
//! | digital state 0 / 1 | handle 28 / 33 | u8, remapped | - |

use std::fmt;

use uuid::Uuid;

use crate::codec::Format;
use crate::error::RegistryError;
use crate::key::{DeviceInfoKey, DigitalKey, LightKey, SensorKey};

/// Build a 128-bit UUID from a 16-bit Bluetooth SIG assigned number.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn sig_uuid(short: u16) -> Uuid {
    Uuid::from_u128(((short as u128) << 96) | 0x0000_0000_0000_1000_8000_0080_5f9b_34fb)
}

pub const BATTERY_LEVEL: Uuid = sig_uuid(0x2A19);
pub const POWER_SOURCE: Uuid = Uuid::from_u128(0xec61_a454_ed01_a5e8_b8f9_de9e_c026_ec51);
pub const TEMPERATURE: Uuid = sig_uuid(0x2A6E);
pub const HUMIDITY: Uuid = sig_uuid(0x2A6F);
pub const PRESSURE: Uuid = sig_uuid(0x2A6D);
pub const UV_INDEX: Uuid = sig_uuid(0x2A76);
pub const SOUND_LEVEL: Uuid = Uuid::from_u128(0xc854_6913_bf02_45eb_8dde_9f87_54f4_a32e);
pub const AMBIENT_LIGHT: Uuid = Uuid::from_u128(0xc854_6913_bfd9_45eb_8dde_9f87_54f4_a32e);
pub const HALL_FIELD_STRENGTH: Uuid = Uuid::from_u128(0xf598_dbc5_2f02_4ec5_9936_b3d1_aa4f_957f);

pub const DEVICE_NAME: Uuid = sig_uuid(0x2A00);
pub const MANUFACTURER_NAME: Uuid = sig_uuid(0x2A29);
pub const MODEL_NUMBER: Uuid = sig_uuid(0x2A24);
pub const HARDWARE_REVISION: Uuid = sig_uuid(0x2A27);
pub const FIRMWARE_REVISION: Uuid = sig_uuid(0x2A26);

pub const RGB_LEDS: Uuid = Uuid::from_u128(0xfcb8_9c40_c603_59f3_7dc3_5ece_444a_401b);

/// Automation IO digital characteristic, shared by both digital states.
pub const AIO_DIGITAL: Uuid = sig_uuid(0x2A56);
/// Handle of the button input (`aio_digital_in`, read + notify).
pub const HANDLE_DIGITAL_STATE_0: u16 = 28;
/// Handle of the LED output (`aio_digital_out`, read + write).
pub const HANDLE_DIGITAL_STATE_1: u16 = 33;

/// Silicon Labs Bluetooth SIG company identifier.
pub const MANUFACTURER_ID: u16 = 0x0047;

/// Product name used to build a friendly device name.
pub const PRODUCT_NAME: &str = "Thunderboard";

/// Power source codes.
pub const POWER_SOURCE_MAP: &[(i64, &str)] = &[(1, "USB"), (4, "Battery")];

/// Digital state 0 codes → indices of pressed buttons (BTN0 is bit 0, BTN1 bit 2).
pub const DIGITAL_STATE_MAP: &[(i64, &[u8])] = &[(0, &[]), (1, &[0]), (4, &[1]), (5, &[0, 1])];

/// How a characteristic is addressed on the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicId {
    Uuid(Uuid),
    Handle(u16),
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(uuid) => write!(f, "{uuid}"),
            Self::Handle(handle) => write!(f, "handle {handle}"),
        }
    }
}

/// Static description of one characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicDescriptor<K> {
    pub id: CharacteristicId,
    pub key: K,
    pub format: Format,
    /// The raw value is divided by this to get the unit value.
    pub divider: Option<u32>,
    /// Raw code → label table, for enumerated characteristics.
    pub remap: Option<&'static [(i64, &'static str)]>,
    /// Unit of the decoded value.
    pub unit: Option<&'static str>,
    /// Human-readable name.
    pub label: &'static str,
}

impl<K> CharacteristicDescriptor<K> {
    const fn new(id: CharacteristicId, key: K, format: Format, label: &'static str) -> Self {
        Self {
            id,
            key,
            format,
            divider: None,
            remap: None,
            unit: None,
            label,
        }
    }

    const fn divider(mut self, divider: u32) -> Self {
        self.divider = Some(divider);
        self
    }

    const fn remap(mut self, table: &'static [(i64, &'static str)]) -> Self {
        self.remap = Some(table);
        self
    }

    const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }
}

type Sensor = CharacteristicDescriptor<SensorKey>;

/// Environmental and power characteristics, in read order.
pub const SENSOR_CHARACTERISTICS: &[Sensor] = &[
    Sensor::new(CharacteristicId::Uuid(BATTERY_LEVEL), SensorKey::Battery, Format::U8, "Battery")
        .unit("%"),
    Sensor::new(
        CharacteristicId::Uuid(POWER_SOURCE),
        SensorKey::PowerSource,
        Format::U8,
        "Power source",
    )
    .remap(POWER_SOURCE_MAP),
    Sensor::new(
        CharacteristicId::Uuid(TEMPERATURE),
        SensorKey::Temperature,
        Format::I16Le,
        "Temperature",
    )
    .divider(100)
    .unit("°C"),
    Sensor::new(CharacteristicId::Uuid(HUMIDITY), SensorKey::Humidity, Format::U16Le, "Humidity")
        .divider(100)
        .unit("%"),
    Sensor::new(CharacteristicId::Uuid(PRESSURE), SensorKey::Pressure, Format::U32Le, "Pressure")
        .divider(10)
        .unit("Pa"),
    Sensor::new(CharacteristicId::Uuid(UV_INDEX), SensorKey::UvIndex, Format::U8, "UV Index"),
    Sensor::new(
        CharacteristicId::Uuid(SOUND_LEVEL),
        SensorKey::SoundLevel,
        Format::I16Le,
        "Sound level",
    )
    .divider(100)
    .unit("dBA"),
    Sensor::new(
        CharacteristicId::Uuid(AMBIENT_LIGHT),
        SensorKey::AmbientLight,
        Format::U32Le,
        "Ambient light",
    )
    .divider(100)
    .unit("lx"),
    Sensor::new(
        CharacteristicId::Uuid(HALL_FIELD_STRENGTH),
        SensorKey::HallFieldStrength,
        Format::I32Le,
        "Hall field strength",
    )
    .unit("uT"),
];

type DeviceInfo = CharacteristicDescriptor<DeviceInfoKey>;

/// Identity strings. The name is read first, the model is needed to build a
/// friendly name when the name comes back empty.
pub const DEVICE_INFO_CHARACTERISTICS: &[DeviceInfo] = &[
    DeviceInfo::new(
        CharacteristicId::Uuid(DEVICE_NAME),
        DeviceInfoKey::Name,
        Format::Utf8,
        "Device name",
    ),
    DeviceInfo::new(
        CharacteristicId::Uuid(MODEL_NUMBER),
        DeviceInfoKey::Model,
        Format::Utf8,
        "Model number",
    ),
    DeviceInfo::new(
        CharacteristicId::Uuid(HARDWARE_REVISION),
        DeviceInfoKey::HardwareRevision,
        Format::Utf8,
        "Hardware revision",
    ),
    DeviceInfo::new(
        CharacteristicId::Uuid(FIRMWARE_REVISION),
        DeviceInfoKey::FirmwareRevision,
        Format::Utf8,
        "Firmware revision",
    ),
    DeviceInfo::new(
        CharacteristicId::Uuid(MANUFACTURER_NAME),
        DeviceInfoKey::Manufacturer,
        Format::Utf8,
        "Manufacturer name",
    ),
];

type Light = CharacteristicDescriptor<LightKey>;

/// RGB LED characteristic. Payload is `(mode, r, g, b)`.
pub const LIGHT_CHARACTERISTICS: &[Light] = &[Light::new(
    CharacteristicId::Uuid(RGB_LEDS),
    LightKey::RgbLeds1,
    Format::U8x4,
    "RGB LEDs",
)];

type Digital = CharacteristicDescriptor<DigitalKey>;

/// Automation IO digital states.
pub const DIGITAL_CHARACTERISTICS: &[Digital] = &[
    Digital::new(
        CharacteristicId::Handle(HANDLE_DIGITAL_STATE_0),
        DigitalKey::DigitalState0,
        Format::U8,
        "Digital state 0",
    ),
    Digital::new(
        CharacteristicId::Handle(HANDLE_DIGITAL_STATE_1),
        DigitalKey::DigitalState1,
        Format::U8,
        "Digital state 1",
    ),
];

fn lookup<K: Copy + PartialEq>(
    table: &'static [CharacteristicDescriptor<K>],
    key: K,
    name: &'static str,
) -> Result<&'static CharacteristicDescriptor<K>, RegistryError> {
    table
        .iter()
        .find(|c| c.key == key)
        .ok_or(RegistryError::UnknownKey(name))
}

/// Descriptor of a sensor characteristic.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownKey`] when `key` is not registered.
pub fn sensor(key: SensorKey) -> Result<&'static Sensor, RegistryError> {
    lookup(SENSOR_CHARACTERISTICS, key, key.as_str())
}

/// Descriptor of an identity characteristic.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownKey`] when `key` is not registered.
pub fn device_info(key: DeviceInfoKey) -> Result<&'static DeviceInfo, RegistryError> {
    lookup(DEVICE_INFO_CHARACTERISTICS, key, key.as_str())
}

/// Descriptor of a light characteristic.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownKey`] when `key` is not registered.
pub fn light(key: LightKey) -> Result<&'static Light, RegistryError> {
    lookup(LIGHT_CHARACTERISTICS, key, key.as_str())
}

/// Descriptor of a digital-state characteristic.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownKey`] when `key` is not registered.
/// Buttons are derived from digital state 0 and have no descriptor.
pub fn digital(key: DigitalKey) -> Result<&'static Digital, RegistryError> {
    lookup(DIGITAL_CHARACTERISTICS, key, key.as_str())
}
