//! Thunderboard service: the facade a scheduler drives for one board.
//!
//! Owns the (optionally kept) session, the lights controller and the live
//! snapshot. A single lock serializes every operation, so a poll cycle, a
//! light command and enabling notifications never interleave on the
//! connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;

use thunderboard_domain::device::DeviceSnapshot;
use thunderboard_domain::error::{ThunderboardError, report};
use thunderboard_domain::event::DeviceEvent;
use thunderboard_domain::key::DigitalKey;
use thunderboard_domain::lights::{LightsState, Rgb};
use thunderboard_domain::registry;

use crate::event_bus::InProcessEventBus;
use crate::ports::{Connection, EventPublisher, PeripheralRef, Transport};
use crate::services::connection_manager::{ConnectionManager, Session};
use crate::services::device_reader;
use crate::services::lights_controller::LightsController;
use crate::services::notification_handler::NotificationHandler;

const NOTIFICATION_BUFFER: usize = 32;

/// How an update cycle connects and what happens to the session afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Keep the session open after the cycle for reuse.
    pub keep_connected: bool,
    /// Budget of a single connection attempt.
    pub attempt_timeout: Duration,
    /// Connection attempts before giving up.
    pub max_attempts: u32,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            keep_connected: true,
            attempt_timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

enum LightCommand<'a> {
    AllOn { rgb: Rgb, brightness: u8 },
    AllOff,
    Leds { leds: &'a [u8], rgb: Rgb, brightness: u8 },
}

struct State<C> {
    peripheral: PeripheralRef,
    options: UpdateOptions,
    session: Option<Session<C>>,
    lights: LightsController,
    notifications: Option<JoinHandle<()>>,
}

/// Driver for one Thunderboard.
pub struct ThunderboardService<T: Transport> {
    manager: ConnectionManager<T>,
    state: Mutex<State<T::Connection>>,
    snapshot: Arc<RwLock<DeviceSnapshot>>,
    bus: Arc<InProcessEventBus>,
}

impl<T: Transport> ThunderboardService<T> {
    /// Create a service for `peripheral`.
    ///
    /// `options` apply to light commands issued before the first
    /// [`update_device`](Self::update_device) call.
    pub fn new(
        transport: T,
        peripheral: PeripheralRef,
        options: UpdateOptions,
        bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            manager: ConnectionManager::new(transport),
            snapshot: Arc::new(RwLock::new(DeviceSnapshot::for_peripheral(&peripheral))),
            state: Mutex::new(State {
                peripheral,
                options,
                session: None,
                lights: LightsController::new(),
                notifications: None,
            }),
            bus,
        }
    }

    /// Run one update cycle and return what it learned.
    ///
    /// Never fails: when the board cannot be reached the snapshot carries
    /// only the address, RSSI and the error. A kept session is reused; a
    /// session that produced a degraded read is closed so the next cycle
    /// reconnects.
    #[tracing::instrument(skip(self, peripheral), fields(address = %peripheral.address))]
    pub async fn update_device(
        &self,
        peripheral: &PeripheralRef,
        options: UpdateOptions,
    ) -> DeviceSnapshot {
        let mut state = self.state.lock().await;
        state.peripheral = peripheral.clone();
        state.options = options;

        let (session, reused) = match state.session.take() {
            Some(session) => (session, true),
            None => match self
                .manager
                .acquire(peripheral, options.attempt_timeout, options.max_attempts)
                .await
            {
                Ok(session) => (session, false),
                Err(err) => {
                    tracing::warn!(error = %report(&err), "device unreachable");
                    let mut snapshot = DeviceSnapshot::for_peripheral(peripheral);
                    snapshot.record_error(report(&err));
                    self.store(snapshot.clone()).await;
                    return snapshot;
                }
            },
        };

        let snapshot = device_reader::read_device(session.connection(), peripheral).await;
        if let Some(lights) = snapshot.lights {
            state.lights.observe(lights);
        }

        let stale = reused && snapshot.error.is_some();
        if stale {
            tracing::debug!("dropping reused session after degraded read");
        }
        state.session = self
            .manager
            .release(session, options.keep_connected && !stale)
            .await;

        self.store(snapshot.clone()).await;
        snapshot
    }

    /// Subscribe to button notifications on the kept session.
    ///
    /// Decoded presses are merged into the live snapshot and published as
    /// [`DeviceEvent::ButtonsChanged`] on the returned receiver.
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::NotConnected`] when no session is kept,
    /// or [`ThunderboardError::Transport`] when subscribing fails.
    #[tracing::instrument(skip(self))]
    pub async fn enable_button_notifications(
        &self,
    ) -> Result<broadcast::Receiver<DeviceEvent>, ThunderboardError> {
        let mut state = self.state.lock().await;
        let session = state
            .session
            .as_ref()
            .ok_or(ThunderboardError::NotConnected)?;
        let descriptor = registry::digital(DigitalKey::DigitalState0)?;

        let events = self.bus.subscribe();
        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        session.connection().subscribe(descriptor.id, tx).await?;

        let handler =
            NotificationHandler::new(session.address(), self.snapshot.clone(), self.bus.clone());
        if let Some(previous) = state.notifications.replace(tokio::spawn(handler.run(rx))) {
            previous.abort();
        }

        tracing::info!("button notifications enabled");
        Ok(events)
    }

    /// Light all LEDs with `rgb` at `brightness`.
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::ConnectionFailed`] when no session could
    /// be opened, or [`ThunderboardError::WriteFailed`] when the write failed.
    pub async fn turn_on(
        &self,
        rgb: Rgb,
        brightness: u8,
    ) -> Result<LightsState, ThunderboardError> {
        self.command(LightCommand::AllOn { rgb, brightness }).await
    }

    /// Switch all LEDs off.
    ///
    /// # Errors
    ///
    /// Same as [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self) -> Result<LightsState, ThunderboardError> {
        self.command(LightCommand::AllOff).await
    }

    /// Light exactly the given LEDs (numbered 1 to 4).
    ///
    /// # Errors
    ///
    /// Same as [`turn_on`](Self::turn_on), plus
    /// [`ThunderboardError::Registry`] for LEDs outside `1..=4`.
    pub async fn set_leds(
        &self,
        leds: &[u8],
        rgb: Rgb,
        brightness: u8,
    ) -> Result<LightsState, ThunderboardError> {
        self.command(LightCommand::Leds {
            leds,
            rgb,
            brightness,
        })
        .await
    }

    /// Close the kept session and stop notification forwarding.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.notifications.take() {
            task.abort();
        }
        if let Some(session) = state.session.take() {
            session.close().await;
        }
    }

    /// Whether a session is currently kept open.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// Last known light state.
    pub async fn lights(&self) -> LightsState {
        self.state.lock().await.lights.state()
    }

    /// Copy of the live snapshot, including button changes since the last
    /// update cycle.
    pub async fn snapshot(&self) -> DeviceSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Subscribe to every event about this board.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.bus.subscribe()
    }

    async fn command(&self, command: LightCommand<'_>) -> Result<LightsState, ThunderboardError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let session = match state.session.take() {
            Some(session) => session,
            None => {
                self.manager
                    .acquire(
                        &state.peripheral,
                        state.options.attempt_timeout,
                        state.options.max_attempts,
                    )
                    .await?
            }
        };

        let connection = session.connection();
        let result = match command {
            LightCommand::AllOn { rgb, brightness } => {
                state.lights.turn_all_on(connection, rgb, brightness).await
            }
            LightCommand::AllOff => state.lights.turn_all_off(connection).await,
            LightCommand::Leds {
                leds,
                rgb,
                brightness,
            } => state.lights.set_leds(connection, leds, rgb, brightness).await,
        };
        let address = session.address().to_owned();
        state.session = self
            .manager
            .release(session, state.options.keep_connected)
            .await;

        let lights = result?;
        self.snapshot.write().await.lights = Some(lights);
        self.publish(DeviceEvent::lights_changed(address, lights)).await;
        Ok(lights)
    }

    async fn store(&self, snapshot: DeviceSnapshot) {
        *self.snapshot.write().await = snapshot.clone();
        self.publish(DeviceEvent::SnapshotUpdated {
            snapshot: Box::new(snapshot),
        })
        .await;
    }

    async fn publish(&self, event: DeviceEvent) {
        if let Err(err) = self.bus.publish(event).await {
            tracing::warn!(%err, "failed to publish device event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ConnectStep, FakeConnection, FakeTransport, peripheral};
    use thunderboard_domain::key::SensorKey;
    use thunderboard_domain::registry::{CharacteristicId, HANDLE_DIGITAL_STATE_0, RGB_LEDS};
    use thunderboard_domain::value::DigitalValue;

    fn make_service(transport: &FakeTransport) -> ThunderboardService<FakeTransport> {
        ThunderboardService::new(
            transport.clone(),
            peripheral(),
            UpdateOptions::default(),
            Arc::new(InProcessEventBus::new(16)),
        )
    }

    fn transient() -> UpdateOptions {
        UpdateOptions {
            keep_connected: false,
            ..UpdateOptions::default()
        }
    }

    #[tokio::test]
    async fn should_return_full_snapshot_and_keep_session() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);

        let snapshot = service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;

        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.sensors.len(), 9);
        assert!(service.is_connected().await);
        assert_eq!(transport.device().disconnects(), 0);
        assert_eq!(service.snapshot().await, snapshot);
    }

    #[tokio::test]
    async fn should_disconnect_exactly_once_when_not_kept() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);

        service.update_device(&peripheral(), transient()).await;

        assert_eq!(transport.device().disconnects(), 1);
        assert!(!service.is_connected().await);
    }

    #[tokio::test]
    async fn should_reuse_kept_session_across_cycles() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);

        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;
        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;

        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn should_return_degraded_snapshot_when_unreachable() {
        let transport = FakeTransport::new(FakeConnection::thunderboard()).script(&[
            ConnectStep::Fail,
            ConnectStep::Fail,
            ConnectStep::Fail,
        ]);
        let service = make_service(&transport);
        let mut events = service.subscribe();

        let snapshot = service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;

        assert_eq!(transport.attempts(), 3);
        assert_eq!(snapshot.address, "00:0B:57:64:88:68");
        assert_eq!(snapshot.rssi, -61);
        assert!(snapshot.sensors.is_empty());
        assert!(
            snapshot
                .error
                .as_deref()
                .unwrap()
                .starts_with("failed to connect to 00:0B:57:64:88:68 after 3 attempt(s)")
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            DeviceEvent::SnapshotUpdated { .. }
        ));
    }

    #[tokio::test]
    async fn should_drop_reused_session_after_degraded_read() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);
        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;
        transport
            .device()
            .fail_read(CharacteristicId::Uuid(registry::BATTERY_LEVEL));

        let snapshot = service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;

        assert!(!snapshot.sensors.contains_key(&SensorKey::Battery));
        assert!(!service.is_connected().await);
        assert_eq!(transport.device().disconnects(), 1);
    }

    #[tokio::test]
    async fn should_require_kept_session_for_notifications() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);

        let result = service.enable_button_notifications().await;

        assert!(matches!(result, Err(ThunderboardError::NotConnected)));
    }

    #[tokio::test]
    async fn should_merge_button_notifications_into_snapshot() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);
        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;

        let mut events = service.enable_button_notifications().await.unwrap();
        let handle = CharacteristicId::Handle(HANDLE_DIGITAL_STATE_0);
        assert_eq!(transport.device().subscriptions(), vec![handle]);

        transport.device().notify(handle, &[5]).await;
        let event = events.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::ButtonsChanged { .. }));

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.button(DigitalKey::Btn0), Some(true));
        assert_eq!(snapshot.button(DigitalKey::Btn1), Some(true));
        assert_eq!(
            snapshot.digitals.get(&DigitalKey::DigitalState0),
            Some(&DigitalValue::List(vec![0, 1]))
        );
        assert_eq!(snapshot.sensors.len(), 9);
    }

    #[tokio::test]
    async fn should_turn_on_over_transient_session() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = ThunderboardService::new(
            transport.clone(),
            peripheral(),
            transient(),
            Arc::new(InProcessEventBus::new(16)),
        );

        let state = service.turn_on(Rgb(255, 0, 0), 128).await.unwrap();

        assert_eq!(state.mode, 15);
        assert_eq!(transport.attempts(), 1);
        assert_eq!(transport.device().disconnects(), 1);
        assert_eq!(
            transport.device().writes(),
            vec![(CharacteristicId::Uuid(RGB_LEDS), vec![15, 128, 0, 0])]
        );
        assert_eq!(service.snapshot().await.lights, Some(state));
    }

    #[tokio::test]
    async fn should_turn_off_over_kept_session() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);
        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;
        let mut events = service.subscribe();

        let state = service.turn_off().await.unwrap();

        assert_eq!(state.mode, 0);
        // colour read during the cycle is kept
        assert_eq!(state.rgb, Rgb(255, 0, 0));
        assert_eq!(transport.attempts(), 1);
        assert_eq!(transport.device().disconnects(), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            DeviceEvent::LightsChanged { .. }
        ));
    }

    #[tokio::test]
    async fn should_report_failed_light_write() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);
        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;
        let before = service.lights().await;
        transport.device().fail_writes(true);

        let result = service.turn_on(Rgb(0, 255, 0), 255).await;

        assert!(matches!(result, Err(ThunderboardError::WriteFailed(_))));
        assert_eq!(service.lights().await, before);
        assert_eq!(service.snapshot().await.lights, Some(before));
    }

    #[tokio::test]
    async fn should_close_kept_session_on_disconnect() {
        let transport = FakeTransport::new(FakeConnection::thunderboard());
        let service = make_service(&transport);
        service
            .update_device(&peripheral(), UpdateOptions::default())
            .await;

        service.disconnect().await;
        service.disconnect().await;

        assert_eq!(transport.device().disconnects(), 1);
        assert!(!service.is_connected().await);
    }
}
