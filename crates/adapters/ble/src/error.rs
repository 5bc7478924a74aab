//! BLE adapter error types.

use thunderboard_domain::error::TransportError;
use thunderboard_domain::registry::CharacteristicId;

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// The configured adapter index does not exist.
    #[error("BLE adapter #{index} not found ({available} available)")]
    AdapterNotFound {
        /// Requested index.
        index: usize,
        /// Number of adapters reported by the host.
        available: usize,
    },

    /// No peripheral with this address has been seen by the adapter.
    #[error("peripheral {address} not found")]
    PeripheralNotFound {
        /// The address that was looked up.
        address: String,
    },

    /// The connected peripheral does not expose the characteristic.
    #[error("characteristic {id} not found")]
    CharacteristicNotFound {
        /// Registry identifier of the missing characteristic.
        id: CharacteristicId,
    },

    /// A btleplug operation failed.
    #[error("BLE error")]
    Ble(#[from] btleplug::Error),
}

impl BleError {
    /// Wrap into a [`TransportError`] for propagation across the port
    /// boundary.
    #[must_use]
    pub fn into_transport(self, operation: impl Into<String>) -> TransportError {
        TransportError::new(operation, self)
    }
}
