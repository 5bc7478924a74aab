//! btleplug implementation of the transport and connection ports.

use std::time::Duration;

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use thunderboard_app::ports::{Connection, Notification, PeripheralRef, Transport};
use thunderboard_domain::error::TransportError;
use thunderboard_domain::registry::CharacteristicId;

use crate::config::BleConfig;
use crate::error::BleError;
use crate::{gatt, scanner};

/// Host BLE adapter used to reach Thunderboards.
pub struct BleTransport {
    adapter: Adapter,
    config: BleConfig,
}

impl BleTransport {
    /// Open the host adapter selected by `config.adapter_index`.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotAvailable`] when the host has no adapter and
    /// [`BleError::AdapterNotFound`] when the index is out of range.
    pub async fn new(config: BleConfig) -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        if adapters.is_empty() {
            return Err(BleError::NotAvailable);
        }
        let available = adapters.len();
        let adapter = adapters
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleError::AdapterNotFound {
                index: config.adapter_index,
                available,
            })?;

        match adapter.adapter_info().await {
            Ok(info) => tracing::info!(adapter = %info, "BLE adapter ready"),
            Err(err) => tracing::warn!(%err, "BLE adapter info unavailable"),
        }

        Ok(Self { adapter, config })
    }

    /// Scan for a board: the one at `address`, or the first Thunderboard
    /// advertising when `address` is `None`.
    ///
    /// Returns `None` when nothing matched before the discovery timeout. A
    /// fresh discovery carries the current signal strength.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::Ble`] when the scan cannot be started.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, address: Option<&str>) -> Result<Option<PeripheralRef>, BleError> {
        scanner::discover(&self.adapter, address, self.config.discovery_timeout()).await
    }

    async fn find_peripheral(&self, address: &str) -> Result<Peripheral, BleError> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            return Ok(peripheral);
        }
        tracing::debug!(%address, "peripheral unknown to adapter, scanning");
        if self.discover(Some(address)).await?.is_none() {
            return Err(BleError::PeripheralNotFound {
                address: address.to_owned(),
            });
        }
        self.known_peripheral(address)
            .await?
            .ok_or_else(|| BleError::PeripheralNotFound {
                address: address.to_owned(),
            })
    }

    async fn known_peripheral(&self, address: &str) -> Result<Option<Peripheral>, BleError> {
        let peripherals = self.adapter.peripherals().await?;
        Ok(peripherals
            .into_iter()
            .find(|p| p.address().to_string().eq_ignore_ascii_case(address)))
    }

    async fn open(&self, address: &str) -> Result<BleConnection, BleError> {
        let peripheral = self.find_peripheral(address).await?;

        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        if let Err(err) = peripheral.discover_services().await {
            if let Err(err) = peripheral.disconnect().await {
                tracing::warn!(%err, %address, "failed to disconnect after discovery error");
            }
            return Err(err.into());
        }

        let characteristics: Vec<Characteristic> =
            peripheral.characteristics().into_iter().collect();
        tracing::debug!(%address, count = characteristics.len(), "services discovered");

        Ok(BleConnection {
            peripheral,
            address: address.to_owned(),
            characteristics,
            operation_timeout: self.config.operation_timeout(),
            forwarders: Mutex::new(Vec::new()),
        })
    }
}

impl Transport for BleTransport {
    type Connection = BleConnection;

    async fn connect(
        &self,
        peripheral: &PeripheralRef,
        timeout: Duration,
    ) -> Result<BleConnection, TransportError> {
        match tokio::time::timeout(timeout, self.open(&peripheral.address)).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(err)) => Err(err.into_transport("connect")),
            Err(_) => Err(TransportError::timeout("connect", timeout)),
        }
    }
}

/// Open GATT session with one board.
pub struct BleConnection {
    peripheral: Peripheral,
    address: String,
    characteristics: Vec<Characteristic>,
    operation_timeout: Duration,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl BleConnection {
    async fn with_timeout<T, F>(&self, operation: String, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, BleError>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into_transport(operation)),
            Err(_) => Err(TransportError::timeout(operation, self.operation_timeout)),
        }
    }

    fn characteristic(&self, id: CharacteristicId) -> Result<Characteristic, BleError> {
        gatt::resolve(&self.characteristics, id)
    }
}

impl Connection for BleConnection {
    fn address(&self) -> &str {
        &self.address
    }

    async fn read(&self, id: CharacteristicId) -> Result<Vec<u8>, TransportError> {
        self.with_timeout(format!("read {id}"), async {
            let characteristic = self.characteristic(id)?;
            Ok(self.peripheral.read(&characteristic).await?)
        })
        .await
    }

    async fn write(&self, id: CharacteristicId, payload: &[u8]) -> Result<(), TransportError> {
        self.with_timeout(format!("write {id}"), async {
            let characteristic = self.characteristic(id)?;
            self.peripheral
                .write(&characteristic, payload, WriteType::WithResponse)
                .await?;
            Ok(())
        })
        .await
    }

    async fn subscribe(
        &self,
        id: CharacteristicId,
        sink: mpsc::Sender<Notification>,
    ) -> Result<(), TransportError> {
        let characteristic = self
            .characteristic(id)
            .map_err(|err| err.into_transport(format!("subscribe {id}")))?;

        let mut stream = self
            .with_timeout(format!("subscribe {id}"), async {
                let stream = self.peripheral.notifications().await?;
                self.peripheral.subscribe(&characteristic).await?;
                Ok(stream)
            })
            .await?;

        let uuid = characteristic.uuid;
        let address = self.address.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid != uuid {
                    continue;
                }
                let notification = Notification {
                    id,
                    payload: notification.value,
                };
                if sink.send(notification).await.is_err() {
                    tracing::debug!(%address, %id, "notification receiver dropped");
                    break;
                }
            }
            tracing::debug!(%address, %id, "notification stream ended");
        });
        self.forwarders.lock().await.push(forwarder);

        tracing::info!(address = %self.address, %id, "subscribed to notifications");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        for forwarder in self.forwarders.lock().await.drain(..) {
            forwarder.abort();
        }
        self.with_timeout("disconnect".to_owned(), async {
            self.peripheral.disconnect().await?;
            Ok(())
        })
        .await?;
        tracing::info!(address = %self.address, "disconnected");
        Ok(())
    }
}
