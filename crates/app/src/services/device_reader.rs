//! Device reader: one full pass over the characteristic registry.
//!
//! The four characteristic groups (identity, sensors, lights, digital states)
//! are read concurrently over the same connection. Inside a group,
//! characteristics are read in registry order and the first failure stops
//! that group only; whatever it decoded so far is kept. A code missing from
//! a remap table only loses that one field.

use thunderboard_domain::button::{self, DigitalDelta};
use thunderboard_domain::codec;
use thunderboard_domain::device::DeviceSnapshot;
use thunderboard_domain::error::{PayloadError, RegistryError, ThunderboardError, report};
use thunderboard_domain::key::DigitalKey;
use thunderboard_domain::lights::LightsState;
use thunderboard_domain::registry::{
    CharacteristicDescriptor, DEVICE_INFO_CHARACTERISTICS, DIGITAL_CHARACTERISTICS,
    LIGHT_CHARACTERISTICS, SENSOR_CHARACTERISTICS,
};
use thunderboard_domain::value::SensorValue;

use crate::ports::{Connection, PeripheralRef};

type Decoder<K, T> = fn(&CharacteristicDescriptor<K>, &[u8]) -> Result<T, ThunderboardError>;

/// Values decoded by one group, plus the failure that stopped it.
struct Partial<K, T> {
    values: Vec<(K, T)>,
    error: Option<String>,
}

/// Read every registered characteristic into a fresh snapshot.
///
/// Never fails: read and decode errors degrade the affected group and the
/// first one (in group order) is recorded in [`DeviceSnapshot::error`].
#[tracing::instrument(skip_all, fields(address = %connection.address()))]
pub async fn read_device<C: Connection>(
    connection: &C,
    peripheral: &PeripheralRef,
) -> DeviceSnapshot {
    let (identity, sensors, lights, digitals) = tokio::join!(
        read_group(connection, DEVICE_INFO_CHARACTERISTICS, decode_identity),
        read_group(connection, SENSOR_CHARACTERISTICS, decode_sensor),
        read_group(connection, LIGHT_CHARACTERISTICS, decode_lights),
        read_group(connection, DIGITAL_CHARACTERISTICS, decode_digital),
    );

    let mut snapshot = DeviceSnapshot::for_peripheral(peripheral);
    snapshot.address = connection.address().to_owned();

    for (key, value) in identity.values {
        snapshot.set_identity(key, value);
    }
    if snapshot.name.is_empty() && snapshot.model.is_some() {
        snapshot.name = snapshot.friendly_name();
    }
    snapshot.merge_sensors(sensors.values.into_iter().collect());
    snapshot.lights = lights.values.into_iter().next().map(|(_, state)| state);
    for (_, delta) in digitals.values {
        snapshot.merge_digitals(delta);
    }

    for error in [identity.error, sensors.error, lights.error, digitals.error]
        .into_iter()
        .flatten()
    {
        snapshot.record_error(error);
    }

    tracing::debug!(
        sensors = snapshot.sensors.len(),
        digitals = snapshot.digitals.len(),
        degraded = snapshot.error.is_some(),
        "device read"
    );
    snapshot
}

async fn read_group<C: Connection, K: Copy, T>(
    connection: &C,
    table: &'static [CharacteristicDescriptor<K>],
    decode: Decoder<K, T>,
) -> Partial<K, T> {
    let mut partial = Partial {
        values: Vec::with_capacity(table.len()),
        error: None,
    };

    for descriptor in table {
        let result = match connection.read(descriptor.id).await {
            Ok(raw) => decode(descriptor, &raw),
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(value) => partial.values.push((descriptor.key, value)),
            Err(err) => {
                let message = format!("{}: {}", descriptor.label, report(&err));
                tracing::warn!(id = %descriptor.id, error = %message, "characteristic read failed");
                if partial.error.is_none() {
                    partial.error = Some(message);
                }
                if !is_field_local(&err) {
                    break;
                }
            }
        }
    }
    partial
}

/// Errors that lose one field while the rest of the group stays readable.
fn is_field_local(err: &ThunderboardError) -> bool {
    matches!(
        err,
        ThunderboardError::Payload(PayloadError::UnmappedCode { .. })
            | ThunderboardError::Registry(RegistryError::UnknownKey(_))
    )
}

fn decode_identity<K>(
    _descriptor: &CharacteristicDescriptor<K>,
    raw: &[u8],
) -> Result<String, ThunderboardError> {
    Ok(codec::decode_string(raw))
}

fn decode_sensor<K>(
    descriptor: &CharacteristicDescriptor<K>,
    raw: &[u8],
) -> Result<SensorValue, ThunderboardError> {
    Ok(codec::decode_sensor(raw, descriptor)?)
}

fn decode_lights<K>(
    _descriptor: &CharacteristicDescriptor<K>,
    raw: &[u8],
) -> Result<LightsState, ThunderboardError> {
    Ok(LightsState::from_payload(raw)?)
}

fn decode_digital(
    descriptor: &CharacteristicDescriptor<DigitalKey>,
    raw: &[u8],
) -> Result<DigitalDelta, ThunderboardError> {
    Ok(button::decode_digital(raw, descriptor.key)?)
}
