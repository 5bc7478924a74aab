//! Digital-state decoding: push buttons on the Automation IO service.
//!
//! Digital state 0 reports the two push buttons as a bitfield (BTN0 in bit 0,
//! BTN1 in bit 2). It is decoded into the list of pressed button indices plus
//! one boolean per button. Digital state 1 drives outputs and is stored raw.

use std::collections::BTreeMap;

use crate::codec::{self, Format};
use crate::error::PayloadError;
use crate::key::DigitalKey;
use crate::registry::DIGITAL_STATE_MAP;
use crate::value::DigitalValue;

/// Digital values to merge into a snapshot, keyed like the snapshot itself.
pub type DigitalDelta = BTreeMap<DigitalKey, DigitalValue>;

/// Decode a button notification (or a read of digital state 0).
///
/// # Errors
///
/// Returns [`PayloadError::MalformedPayload`] when the payload is not exactly
/// one byte, or [`PayloadError::UnmappedCode`] when the value is not one of
/// `0`, `1`, `4`, `5`.
pub fn decode_buttons(payload: &[u8]) -> Result<DigitalDelta, PayloadError> {
    let code = codec::decode(payload, Format::U8)?;
    let pressed = codec::remap(code, DIGITAL_STATE_MAP)?;

    let mut delta = DigitalDelta::new();
    delta.insert(DigitalKey::Btn0, DigitalValue::Bool(pressed.contains(&0)));
    delta.insert(DigitalKey::Btn1, DigitalValue::Bool(pressed.contains(&1)));
    delta.insert(DigitalKey::DigitalState0, DigitalValue::List(pressed.to_vec()));
    Ok(delta)
}

/// Decode a digital-state read for the given key.
///
/// # Errors
///
/// Same as [`decode_buttons`] for digital state 0; only the length is
/// checked for the other states.
pub fn decode_digital(payload: &[u8], key: DigitalKey) -> Result<DigitalDelta, PayloadError> {
    if key == DigitalKey::DigitalState0 {
        return decode_buttons(payload);
    }
    let raw = codec::decode(payload, Format::U8)?;
    Ok(DigitalDelta::from([(key, DigitalValue::Int(raw))]))
}
