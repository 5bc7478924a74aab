//! # thunderboardd: Thunderboard polling daemon
//!
//! Composition root that wires the BLE adapter to the Thunderboard service
//! and polls one board.
//!
//! ## Responsibilities
//! - Load configuration (`thunderboard.toml`, env vars)
//! - Initialize tracing
//! - Open the host BLE adapter and find the board
//! - Run an update cycle every `scan_interval_secs`, plus a debounced one
//!   after each button press
//! - Keep button notifications enabled on every new kept session
//! - Close the session on SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use thunderboard_adapter_ble::BleTransport;
use thunderboard_app::event_bus::InProcessEventBus;
use thunderboard_app::ports::PeripheralRef;
use thunderboard_app::services::ThunderboardService;
use thunderboard_domain::event::DeviceEvent;
use thunderboard_domain::time::Debounce;

use crate::config::{Config, DeviceConfig};

const EVENT_BUS_CAPACITY: usize = 64;

/// Errors that stop the daemon before polling starts.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("no Thunderboard advertising nearby")]
    NoBoard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let transport = Arc::new(BleTransport::new(config.ble.clone()).await?);
    let mut peripheral = locate(&transport, &config.device).await?;
    tracing::info!(address = %peripheral.address, name = ?peripheral.name, "driving board");

    let options = config.device.update_options();
    let bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));
    let service = ThunderboardService::new(transport.clone(), peripheral.clone(), options, bus);

    let mut events = service.subscribe();
    let mut debounce = Debounce::new(config.device.event_debounce());
    let mut ticker = tokio::time::interval(config.device.scan_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh(&service, &transport, &mut peripheral, &config.device).await;
            }
            event = events.recv() => match event {
                Ok(DeviceEvent::ButtonsChanged { at, .. }) => {
                    if debounce.should_refresh(at) {
                        tracing::debug!("button event, refreshing");
                        refresh(&service, &transport, &mut peripheral, &config.device).await;
                        ticker.reset();
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    service.disconnect().await;
    Ok(())
}

/// Resolve the board to drive: the configured address, or the first
/// Thunderboard that advertises.
async fn locate(
    transport: &BleTransport,
    device: &DeviceConfig,
) -> Result<PeripheralRef, Box<dyn std::error::Error>> {
    match &device.address {
        Some(address) => Ok(transport
            .discover(Some(address.as_str()))
            .await?
            .unwrap_or_else(|| PeripheralRef {
                address: address.clone(),
                name: None,
                rssi: None,
            })),
        None => Ok(transport
            .discover(None)
            .await?
            .ok_or(StartupError::NoBoard)?),
    }
}

/// Run one update cycle and log its outcome.
///
/// A connected board does not advertise, so the peripheral reference is
/// only refreshed (for its signal strength) while no session is kept.
async fn refresh(
    service: &ThunderboardService<Arc<BleTransport>>,
    transport: &BleTransport,
    peripheral: &mut PeripheralRef,
    device: &DeviceConfig,
) {
    let was_connected = service.is_connected().await;
    if !was_connected {
        match transport.discover(Some(peripheral.address.as_str())).await {
            Ok(Some(found)) => *peripheral = found,
            Ok(None) => tracing::debug!(address = %peripheral.address, "board not advertising"),
            Err(err) => tracing::warn!(%err, "discovery failed"),
        }
    }

    let snapshot = service
        .update_device(peripheral, device.update_options())
        .await;
    match &snapshot.error {
        Some(error) => tracing::warn!(address = %snapshot.address, %error, "update degraded"),
        None => tracing::info!(address = %snapshot.address, "update complete"),
    }
    match serde_json::to_string(&snapshot) {
        Ok(json) => tracing::debug!(snapshot = %json, "snapshot"),
        Err(err) => tracing::warn!(%err, "failed to serialize snapshot"),
    }

    if device.button_notifications && !was_connected && service.is_connected().await {
        if let Err(err) = service.enable_button_notifications().await {
            tracing::warn!(%err, "failed to enable button notifications");
        }
    }
}
