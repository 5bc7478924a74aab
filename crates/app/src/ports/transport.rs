//! Transport port: the BLE stack as seen by the driver.
//!
//! The driver never touches a BLE library directly. A [`Transport`] opens
//! connections; a [`Connection`] performs GATT operations addressed by
//! [`CharacteristicId`]. Adapters (e.g. `thunderboard-adapter-ble`) implement
//! both and wrap their native failures in [`TransportError`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use thunderboard_domain::error::TransportError;
use thunderboard_domain::registry::CharacteristicId;

pub use thunderboard_domain::device::PeripheralRef;

/// A value pushed by the peripheral on a subscribed characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: CharacteristicId,
    pub payload: Vec<u8>,
}

/// Opens GATT connections to peripherals.
pub trait Transport: Send + Sync {
    /// The connection type handed out on success.
    type Connection: Connection;

    /// Connect to `peripheral` and discover its services.
    ///
    /// `timeout` is the budget for this single attempt; implementations may
    /// use it for their own discovery steps. Callers enforce it as well.
    fn connect(
        &self,
        peripheral: &PeripheralRef,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    type Connection = T::Connection;

    fn connect(
        &self,
        peripheral: &PeripheralRef,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send {
        (**self).connect(peripheral, timeout)
    }
}

/// An established GATT connection.
///
/// Operations may be issued concurrently from several tasks on a shared
/// reference; implementations serialize internally if the stack requires it.
pub trait Connection: Send + Sync {
    /// Address of the connected peripheral.
    fn address(&self) -> &str;

    /// Read the current value of a characteristic.
    fn read(
        &self,
        id: CharacteristicId,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Write `payload` to a characteristic, waiting for the response.
    fn write(
        &self,
        id: CharacteristicId,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Enable notifications on a characteristic and forward every value to
    /// `sink` until the connection is closed.
    fn subscribe(
        &self,
        id: CharacteristicId,
        sink: mpsc::Sender<Notification>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection. Forwarding of notifications stops.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
