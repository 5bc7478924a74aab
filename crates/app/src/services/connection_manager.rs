//! Connection manager: bounded-retry connect and scoped release.

use std::time::Duration;

use thunderboard_domain::error::{ThunderboardError, TransportError};

use crate::ports::{Connection, PeripheralRef, Transport};

/// An open connection to one peripheral.
///
/// Owned by exactly one operation at a time. It is closed by
/// [`ConnectionManager::release`] unless the caller asks to keep it.
pub struct Session<C> {
    connection: C,
    peripheral: PeripheralRef,
}

impl<C: Connection> Session<C> {
    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn peripheral(&self) -> &PeripheralRef {
        &self.peripheral
    }

    /// Address reported by the connection.
    pub fn address(&self) -> &str {
        self.connection.address()
    }

    /// Close the connection, logging rather than propagating failures.
    pub(crate) async fn close(self) {
        if let Err(err) = self.connection.disconnect().await {
            tracing::warn!(%err, address = %self.peripheral.address, "failed to disconnect peripheral");
        } else {
            tracing::debug!(address = %self.peripheral.address, "peripheral disconnected");
        }
    }
}

/// Opens sessions through a [`Transport`] with bounded retries.
pub struct ConnectionManager<T> {
    transport: T,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a new manager backed by the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Connect to `peripheral`, retrying up to `max_attempts` times.
    ///
    /// Each attempt is bounded by `timeout`, and the whole loop by
    /// `timeout * max_attempts`. A `max_attempts` of zero makes one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::ConnectionFailed`] carrying the number of
    /// attempts made and the last transport error once every attempt failed
    /// or the overall budget ran out.
    #[tracing::instrument(skip(self, peripheral), fields(address = %peripheral.address))]
    pub async fn acquire(
        &self,
        peripheral: &PeripheralRef,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Session<T::Connection>, ThunderboardError> {
        let max_attempts = max_attempts.max(1);
        let budget = timeout.saturating_mul(max_attempts);

        let mut attempts = 0;
        let mut last_error = None;

        let outcome = tokio::time::timeout(budget, async {
            for attempt in 1..=max_attempts {
                attempts = attempt;
                tracing::debug!(attempt, max_attempts, "connecting");

                match tokio::time::timeout(timeout, self.transport.connect(peripheral, timeout))
                    .await
                {
                    Ok(Ok(connection)) => return Some(connection),
                    Ok(Err(err)) => {
                        tracing::warn!(%err, attempt, max_attempts, "connection attempt failed");
                        last_error = Some(err);
                    }
                    Err(_) => {
                        tracing::warn!(attempt, max_attempts, "connection attempt timed out");
                        last_error = Some(TransportError::timeout("connect", timeout));
                    }
                }
            }
            None
        })
        .await;

        match outcome {
            Ok(Some(connection)) => {
                tracing::info!(attempts, "connected");
                Ok(Session {
                    connection,
                    peripheral: peripheral.clone(),
                })
            }
            Ok(None) => Err(ThunderboardError::ConnectionFailed {
                address: peripheral.address.clone(),
                attempts,
                last: last_error,
            }),
            Err(_) => {
                tracing::warn!(?budget, attempts, "connection budget exhausted");
                Err(ThunderboardError::ConnectionFailed {
                    address: peripheral.address.clone(),
                    attempts,
                    last: Some(
                        last_error.unwrap_or_else(|| TransportError::timeout("connect", budget)),
                    ),
                })
            }
        }
    }

    /// End an operation's use of `session`.
    ///
    /// Disconnects unless `keep_connected` is set, in which case the session
    /// is handed back for reuse by a later operation.
    pub async fn release(
        &self,
        session: Session<T::Connection>,
        keep_connected: bool,
    ) -> Option<Session<T::Connection>> {
        if keep_connected {
            return Some(session);
        }
        session.close().await;
        None
    }
}
