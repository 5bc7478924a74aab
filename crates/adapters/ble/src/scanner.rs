//! BLE scanner: finds a Thunderboard among advertising peripherals.
//!
//! Boards are recognised by the Silicon Labs company id in their
//! manufacturer data, or by the `Thunder Sense` local name when the
//! advertisement carries no manufacturer data.

use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::Adapter;
use tokio_stream::StreamExt as _;

use thunderboard_app::ports::PeripheralRef;
use thunderboard_domain::registry::MANUFACTURER_ID;

use crate::error::BleError;

/// Local name prefix advertised by Thunderboard Sense 2 firmware.
const LOCAL_NAME_PREFIX: &str = "Thunder Sense";

/// Whether an advertisement comes from a Thunderboard.
pub(crate) fn is_thunderboard(props: &PeripheralProperties) -> bool {
    props.manufacturer_data.contains_key(&MANUFACTURER_ID)
        || props
            .local_name
            .as_deref()
            .is_some_and(|name| name.starts_with(LOCAL_NAME_PREFIX))
}

/// Whether an advertisement is the one the caller is looking for: the given
/// address, or any Thunderboard when no address is given.
pub(crate) fn is_wanted(props: &PeripheralProperties, address: Option<&str>) -> bool {
    match address {
        Some(address) => props.address.to_string().eq_ignore_ascii_case(address),
        None => is_thunderboard(props),
    }
}

pub(crate) fn peripheral_ref(props: &PeripheralProperties) -> PeripheralRef {
    PeripheralRef {
        address: props.address.to_string(),
        name: props.local_name.clone(),
        rssi: props.rssi,
    }
}

/// Scan until a wanted peripheral advertises or `timeout` elapses.
///
/// # Errors
///
/// Returns [`BleError::Ble`] when the scan cannot be started.
pub(crate) async fn discover(
    adapter: &Adapter,
    address: Option<&str>,
    timeout: Duration,
) -> Result<Option<PeripheralRef>, BleError> {
    let mut events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;

    let deadline = tokio::time::Instant::now() + timeout;
    let found = loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, events.next()).await {
            Ok(Some(
                CentralEvent::DeviceDiscovered(id)
                | CentralEvent::DeviceUpdated(id)
                | CentralEvent::ManufacturerDataAdvertisement { id, .. },
            )) => {
                let Ok(peripheral) = adapter.peripheral(&id).await else {
                    continue;
                };
                let Ok(Some(props)) = peripheral.properties().await else {
                    continue;
                };
                if is_wanted(&props, address) {
                    tracing::debug!(address = %props.address, rssi = ?props.rssi, "peripheral found");
                    break Some(peripheral_ref(&props));
                }
                tracing::trace!(address = %props.address, name = ?props.local_name, "skipping peripheral");
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break None,
        }
    };

    if let Err(err) = adapter.stop_scan().await {
        tracing::warn!(%err, "failed to stop BLE scan");
    }
    Ok(found)
}
