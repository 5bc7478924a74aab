//! Fixed-width binary codec for characteristic payloads.
//!
//! Pure functions operating on raw `&[u8]` slices. All multi-byte integers on
//! this board are little-endian.
//!
//! | Format | Width | Type |
//! |--------|-------|------|
//! | `U8` | 1 | u8 |
//! | `I16Le` | 2 | i16 LE |
//! | `U16Le` | 2 | u16 LE |
//! | `U32Le` | 4 | u32 LE |
//! | `I32Le` | 4 | i32 LE |
//! | `U8x4` | 4 | four u8 (mode, r, g, b) |
//! | `Utf8` | any | UTF-8 string |

use crate::error::PayloadError;
use crate::registry::CharacteristicDescriptor;
use crate::value::SensorValue;

/// Binary layout of a characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    U8,
    I16Le,
    U16Le,
    U32Le,
    I32Le,
    U8x4,
    Utf8,
}

impl Format {
    /// Number of bytes a payload of this format occupies, `None` for
    /// variable-length strings.
    #[must_use]
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::I16Le | Self::U16Le => Some(2),
            Self::U32Le | Self::I32Le | Self::U8x4 => Some(4),
            Self::Utf8 => None,
        }
    }

    /// Human-readable name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I16Le => "i16 LE",
            Self::U16Le => "u16 LE",
            Self::U32Le => "u32 LE",
            Self::I32Le => "i32 LE",
            Self::U8x4 => "4 x u8",
            Self::Utf8 => "utf-8",
        }
    }

    fn check(self, raw: &[u8]) -> Result<(), PayloadError> {
        match self.width() {
            Some(expected) if raw.len() != expected => Err(PayloadError::MalformedPayload {
                format: self.name(),
                expected,
                actual: raw.len(),
            }),
            Some(_) => Ok(()),
            None => Err(PayloadError::NotNumeric {
                format: self.name(),
            }),
        }
    }
}

/// Decode a scalar payload into an integer.
///
/// `U8x4` decodes as a big-endian `u32` of its four bytes; use
/// [`decode_tuple`] to get the individual components.
///
/// # Errors
///
/// Returns [`PayloadError::MalformedPayload`] when the slice length does not
/// match the format's width, or [`PayloadError::NotNumeric`] for string
/// formats.
pub fn decode(raw: &[u8], format: Format) -> Result<i64, PayloadError> {
    format.check(raw)?;
    let value = match format {
        Format::U8 => i64::from(raw[0]),
        Format::I16Le => i64::from(i16::from_le_bytes([raw[0], raw[1]])),
        Format::U16Le => i64::from(u16::from_le_bytes([raw[0], raw[1]])),
        Format::U32Le => i64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        Format::I32Le => i64::from(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        Format::U8x4 => i64::from(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])),
        Format::Utf8 => {
            return Err(PayloadError::NotNumeric {
                format: format.name(),
            });
        }
    };
    Ok(value)
}

/// Decode a four-byte tuple payload.
///
/// # Errors
///
/// Returns [`PayloadError::MalformedPayload`] when the slice is not 4 bytes.
pub fn decode_tuple(raw: &[u8]) -> Result<[u8; 4], PayloadError> {
    Format::U8x4.check(raw)?;
    Ok([raw[0], raw[1], raw[2], raw[3]])
}

/// Encode a value into the given format.
///
/// For scalar formats `values` holds one element; for `U8x4` it holds four,
/// each of which must fit in a byte.
///
/// # Errors
///
/// Returns [`PayloadError::MalformedPayload`] when the number of values does
/// not match the format, [`PayloadError::OutOfRange`] when a value is
/// outside the range the format can represent, or
/// [`PayloadError::NotNumeric`] for string formats.
pub fn encode(values: &[i64], format: Format) -> Result<Vec<u8>, PayloadError> {
    let expected = if format == Format::U8x4 { 4 } else { 1 };
    if values.len() != expected {
        return Err(PayloadError::MalformedPayload {
            format: format.name(),
            expected,
            actual: values.len(),
        });
    }

    let out_of_range = |value: i64| PayloadError::OutOfRange {
        format: format.name(),
        value,
    };
    let v = values[0];
    let bytes = match format {
        Format::U8 => vec![u8::try_from(v).map_err(|_| out_of_range(v))?],
        Format::I16Le => i16::try_from(v)
            .map_err(|_| out_of_range(v))?
            .to_le_bytes()
            .to_vec(),
        Format::U16Le => u16::try_from(v)
            .map_err(|_| out_of_range(v))?
            .to_le_bytes()
            .to_vec(),
        Format::U32Le => u32::try_from(v)
            .map_err(|_| out_of_range(v))?
            .to_le_bytes()
            .to_vec(),
        Format::I32Le => i32::try_from(v)
            .map_err(|_| out_of_range(v))?
            .to_le_bytes()
            .to_vec(),
        Format::U8x4 => values
            .iter()
            .map(|&c| u8::try_from(c).map_err(|_| out_of_range(c)))
            .collect::<Result<Vec<_>, _>>()?,
        Format::Utf8 => {
            return Err(PayloadError::NotNumeric {
                format: format.name(),
            });
        }
    };
    Ok(bytes)
}

/// Scale a raw value by its unit divider.
///
/// Identity (as `f64`) when no divider is set.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn apply_divider(value: i64, divider: Option<u32>) -> f64 {
    match divider {
        Some(d) => value as f64 / f64::from(d),
        None => value as f64,
    }
}

/// Look a raw code up in a remap table.
///
/// # Errors
///
/// Returns [`PayloadError::UnmappedCode`] when `code` is not in `table`.
pub fn remap<T: Copy>(code: i64, table: &[(i64, T)]) -> Result<T, PayloadError> {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .ok_or(PayloadError::UnmappedCode { code })
}

/// Decode a UTF-8 string characteristic, dropping trailing NUL padding.
#[must_use]
pub fn decode_string(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .to_owned()
}

/// Decode a sensor payload according to its descriptor.
///
/// Remapped characteristics yield [`SensorValue::Text`], characteristics with
/// a divider yield [`SensorValue::Float`], everything else
/// [`SensorValue::Int`].
///
/// # Errors
///
/// Propagates [`decode`] and [`remap`] failures.
pub fn decode_sensor<K>(
    raw: &[u8],
    descriptor: &CharacteristicDescriptor<K>,
) -> Result<SensorValue, PayloadError> {
    let code = decode(raw, descriptor.format)?;
    if let Some(table) = descriptor.remap {
        return Ok(SensorValue::Text(remap(code, table)?.to_owned()));
    }
    Ok(match descriptor.divider {
        Some(_) => SensorValue::Float(apply_divider(code, descriptor.divider)),
        None => SensorValue::Int(code),
    })
}
