//! End-to-end tests for the Thunderboard service.
//!
//! Each test drives the full application layer (connection manager, device
//! reader, lights controller, notification handler, event bus) against a
//! scripted in-memory board. No BLE stack is involved.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thunderboard_app::event_bus::InProcessEventBus;
use thunderboard_app::ports::{Connection, Notification, PeripheralRef, Transport};
use thunderboard_app::services::{ThunderboardService, UpdateOptions};
use thunderboard_domain::error::TransportError;
use thunderboard_domain::event::DeviceEvent;
use thunderboard_domain::key::{DigitalKey, SensorKey};
use thunderboard_domain::lights::Rgb;
use thunderboard_domain::registry::{self, CharacteristicId};
use thunderboard_domain::value::SensorValue;
use tokio::sync::mpsc;

const ADDRESS: &str = "00:0B:57:64:88:68";

#[derive(Default)]
struct Board {
    characteristics: Mutex<HashMap<CharacteristicId, Vec<u8>>>,
    button_sink: Mutex<Option<mpsc::Sender<Notification>>>,
    refuse_connections: AtomicU32,
    connects: AtomicU32,
    disconnects: AtomicU32,
}

impl Board {
    fn sense2() -> Arc<Self> {
        let board = Self::default();
        {
            let mut chars = board.characteristics.lock().unwrap();
            let mut put = |uuid, value: &[u8]| {
                chars.insert(CharacteristicId::Uuid(uuid), value.to_vec());
            };
            put(registry::DEVICE_NAME, b"");
            put(registry::MODEL_NUMBER, b"BRD4166A");
            put(registry::HARDWARE_REVISION, b"A03");
            put(registry::FIRMWARE_REVISION, b"2.0.3");
            put(registry::MANUFACTURER_NAME, b"Silicon Labs");
            put(registry::BATTERY_LEVEL, &[64]);
            put(registry::POWER_SOURCE, &[1]);
            put(registry::TEMPERATURE, &(-512_i16).to_le_bytes());
            put(registry::HUMIDITY, &5230_u16.to_le_bytes());
            put(registry::PRESSURE, &998_765_u32.to_le_bytes());
            put(registry::UV_INDEX, &[0]);
            put(registry::SOUND_LEVEL, &3810_i16.to_le_bytes());
            put(registry::AMBIENT_LIGHT, &25_000_u32.to_le_bytes());
            put(registry::HALL_FIELD_STRENGTH, &345_i32.to_le_bytes());
            put(registry::RGB_LEDS, &[0, 0, 0, 200]);
            chars.insert(
                CharacteristicId::Handle(registry::HANDLE_DIGITAL_STATE_0),
                vec![0],
            );
            chars.insert(
                CharacteristicId::Handle(registry::HANDLE_DIGITAL_STATE_1),
                vec![0],
            );
        }
        Arc::new(board)
    }

    fn value(&self, id: CharacteristicId) -> Option<Vec<u8>> {
        self.characteristics.lock().unwrap().get(&id).cloned()
    }

    async fn press(&self, code: u8) {
        let sink = self.button_sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink.send(Notification {
                id: CharacteristicId::Handle(registry::HANDLE_DIGITAL_STATE_0),
                payload: vec![code],
            })
            .await
            .unwrap();
        }
    }
}

#[derive(Clone)]
struct ScriptedTransport(Arc<Board>);

struct ScriptedConnection(Arc<Board>);

impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    fn connect(
        &self,
        _peripheral: &PeripheralRef,
        _timeout: Duration,
    ) -> impl Future<Output = Result<ScriptedConnection, TransportError>> + Send {
        let board = self.0.clone();
        async move {
            board.connects.fetch_add(1, Ordering::SeqCst);
            let refused = board
                .refuse_connections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(TransportError::new("connect", "le-connection-abort-by-local"));
            }
            Ok(ScriptedConnection(board))
        }
    }
}

impl Connection for ScriptedConnection {
    fn address(&self) -> &str {
        ADDRESS
    }

    fn read(
        &self,
        id: CharacteristicId,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        let value = self.0.value(id);
        async move { value.ok_or_else(|| TransportError::new(format!("read {id}"), "not found")) }
    }

    fn write(
        &self,
        id: CharacteristicId,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.0
            .characteristics
            .lock()
            .unwrap()
            .insert(id, payload.to_vec());
        async { Ok(()) }
    }

    fn subscribe(
        &self,
        _id: CharacteristicId,
        sink: mpsc::Sender<Notification>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        *self.0.button_sink.lock().unwrap() = Some(sink);
        async { Ok(()) }
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.0.disconnects.fetch_add(1, Ordering::SeqCst);
        self.0.button_sink.lock().unwrap().take();
        async { Ok(()) }
    }
}

fn peripheral() -> PeripheralRef {
    PeripheralRef {
        address: ADDRESS.to_owned(),
        name: None,
        rssi: None,
    }
}

fn service(board: &Arc<Board>, options: UpdateOptions) -> ThunderboardService<ScriptedTransport> {
    ThunderboardService::new(
        ScriptedTransport(board.clone()),
        peripheral(),
        options,
        Arc::new(InProcessEventBus::new(64)),
    )
}

#[tokio::test]
async fn should_run_full_session_lifecycle() {
    let board = Board::sense2();
    let options = UpdateOptions::default();
    let service = service(&board, options);

    // first poll connects and keeps the session
    let snapshot = service.update_device(&peripheral(), options).await;
    assert!(snapshot.error.is_none(), "{:?}", snapshot.error);
    assert_eq!(snapshot.name, "Thunderboard BRD4166A");
    assert_eq!(snapshot.rssi, -255);
    assert_eq!(
        snapshot.sensors.get(&SensorKey::Temperature),
        Some(&SensorValue::Float(-5.12))
    );
    assert_eq!(
        snapshot.sensors.get(&SensorKey::PowerSource),
        Some(&SensorValue::Text("USB".to_owned()))
    );
    assert_eq!(snapshot.button(DigitalKey::Btn0), Some(false));

    // button presses land in the live snapshot
    let mut events = service.enable_button_notifications().await.unwrap();
    board.press(1).await;
    let DeviceEvent::ButtonsChanged { digitals, .. } = events.recv().await.unwrap() else {
        panic!("expected a button event");
    };
    assert_eq!(digitals.len(), 3);
    assert_eq!(service.snapshot().await.button(DigitalKey::Btn0), Some(true));

    // light command reuses the kept session
    let lights = service.turn_on(Rgb(255, 0, 0), 128).await.unwrap();
    assert_eq!(lights.mode, 15);
    assert_eq!(
        board.value(CharacteristicId::Uuid(registry::RGB_LEDS)),
        Some(vec![15, 128, 0, 0])
    );

    // next poll reads back what was written
    let snapshot = service.update_device(&peripheral(), options).await;
    let read_back = snapshot.lights.unwrap();
    assert_eq!(read_back.mode, 15);
    assert_eq!(read_back.rgb, Rgb(128, 0, 0));
    assert_eq!(read_back.brightness, 128);

    service.disconnect().await;
    assert_eq!(board.connects.load(Ordering::SeqCst), 1);
    assert_eq!(board.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn should_retry_refused_connections_then_read() {
    let board = Board::sense2();
    board.refuse_connections.store(2, Ordering::SeqCst);
    let options = UpdateOptions {
        keep_connected: false,
        ..UpdateOptions::default()
    };
    let service = service(&board, options);

    let snapshot = service.update_device(&peripheral(), options).await;

    assert!(snapshot.error.is_none());
    assert_eq!(board.connects.load(Ordering::SeqCst), 3);
    assert_eq!(board.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn should_report_unreachable_board_in_snapshot() {
    let board = Board::sense2();
    board.refuse_connections.store(u32::MAX, Ordering::SeqCst);
    let options = UpdateOptions {
        max_attempts: 2,
        ..UpdateOptions::default()
    };
    let service = service(&board, options);

    let snapshot = service.update_device(&peripheral(), options).await;

    assert_eq!(board.connects.load(Ordering::SeqCst), 2);
    assert_eq!(snapshot.address, ADDRESS);
    assert!(snapshot.sensors.is_empty());
    let error = snapshot.error.unwrap();
    assert!(error.contains("after 2 attempt(s)"), "{error}");
    assert!(error.contains("le-connection-abort-by-local"), "{error}");
    assert_eq!(board.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn should_keep_partial_snapshot_when_a_characteristic_is_missing() {
    let board = Board::sense2();
    board
        .characteristics
        .lock()
        .unwrap()
        .remove(&CharacteristicId::Uuid(registry::PRESSURE));
    let options = UpdateOptions {
        keep_connected: false,
        ..UpdateOptions::default()
    };
    let service = service(&board, options);

    let snapshot = service.update_device(&peripheral(), options).await;

    assert!(snapshot.sensors.contains_key(&SensorKey::Humidity));
    assert!(!snapshot.sensors.contains_key(&SensorKey::Pressure));
    assert_eq!(snapshot.model.as_deref(), Some("BRD4166A"));
    assert!(snapshot.lights.is_some());
    assert!(snapshot.error.unwrap().starts_with("Pressure: "));
    assert_eq!(board.disconnects.load(Ordering::SeqCst), 1);
}
