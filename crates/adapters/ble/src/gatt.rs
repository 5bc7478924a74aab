//! GATT characteristic resolution.
//!
//! btleplug addresses characteristics by UUID and does not expose attribute
//! handles. The two Automation IO digital characteristics share UUID
//! `0x2A56`; they are told apart by their properties instead. Handle 28 is
//! the input (buttons), the only one that notifies. Handle 33 is the output.

use btleplug::api::{CharPropFlags, Characteristic};

use thunderboard_domain::registry::{
    AIO_DIGITAL, CharacteristicId, HANDLE_DIGITAL_STATE_0, HANDLE_DIGITAL_STATE_1,
};

use crate::error::BleError;

/// Find the discovered characteristic behind a registry identifier.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] when the peripheral does not
/// expose it.
pub(crate) fn resolve(
    characteristics: &[Characteristic],
    id: CharacteristicId,
) -> Result<Characteristic, BleError> {
    characteristics
        .iter()
        .find(|c| matches(c, id))
        .cloned()
        .ok_or(BleError::CharacteristicNotFound { id })
}

fn matches(characteristic: &Characteristic, id: CharacteristicId) -> bool {
    let notifies = characteristic.properties.contains(CharPropFlags::NOTIFY);
    match id {
        CharacteristicId::Uuid(uuid) => characteristic.uuid == uuid,
        CharacteristicId::Handle(HANDLE_DIGITAL_STATE_0) => {
            characteristic.uuid == AIO_DIGITAL && notifies
        }
        CharacteristicId::Handle(HANDLE_DIGITAL_STATE_1) => {
            characteristic.uuid == AIO_DIGITAL && !notifies
        }
        CharacteristicId::Handle(_) => false,
    }
}
