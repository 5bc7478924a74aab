//! Notification handler: button notifications into the live snapshot.

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use thunderboard_domain::button::{self, DigitalDelta};
use thunderboard_domain::device::DeviceSnapshot;
use thunderboard_domain::error::PayloadError;
use thunderboard_domain::event::DeviceEvent;

use crate::ports::{EventPublisher, Notification};

/// Decode one button notification into the digital values it changes.
///
/// # Errors
///
/// Returns [`PayloadError::MalformedPayload`] unless the payload is a single
/// byte, or [`PayloadError::UnmappedCode`] when that byte is not `0`, `1`,
/// `4` or `5`.
pub fn on_notify(payload: &[u8]) -> Result<DigitalDelta, PayloadError> {
    button::decode_buttons(payload)
}

/// Drains notifications for one peripheral and applies them.
pub struct NotificationHandler<P> {
    address: String,
    snapshot: Arc<RwLock<DeviceSnapshot>>,
    publisher: P,
}

impl<P: EventPublisher + Send + Sync> NotificationHandler<P> {
    pub fn new(
        address: impl Into<String>,
        snapshot: Arc<RwLock<DeviceSnapshot>>,
        publisher: P,
    ) -> Self {
        Self {
            address: address.into(),
            snapshot,
            publisher,
        }
    }

    /// Merge every decoded notification into the live snapshot and publish a
    /// [`DeviceEvent::ButtonsChanged`]. Returns once the channel closes.
    ///
    /// Undecodable payloads are logged and skipped.
    pub async fn run(self, mut notifications: mpsc::Receiver<Notification>) {
        tracing::debug!(address = %self.address, "button notifications started");

        while let Some(notification) = notifications.recv().await {
            let delta = match on_notify(&notification.payload) {
                Ok(delta) => delta,
                Err(err) => {
                    tracing::warn!(
                        %err,
                        address = %self.address,
                        id = %notification.id,
                        "ignoring malformed notification"
                    );
                    continue;
                }
            };

            self.snapshot.write().await.merge_digitals(delta.clone());
            tracing::debug!(address = %self.address, ?delta, "buttons changed");

            let event = DeviceEvent::buttons_changed(self.address.clone(), delta);
            if let Err(err) = self.publisher.publish(event).await {
                tracing::warn!(%err, address = %self.address, "failed to publish button event");
            }
        }

        tracing::debug!(address = %self.address, "button notifications stopped");
    }
}
