//! In-memory transport used by the unit tests of this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use thunderboard_domain::error::TransportError;
use thunderboard_domain::registry::{self, CharacteristicId};

use crate::ports::{Connection, Notification, PeripheralRef, Transport};

pub(crate) const ADDRESS: &str = "00:0B:57:64:88:68";

pub(crate) fn peripheral() -> PeripheralRef {
    PeripheralRef {
        address: ADDRESS.to_owned(),
        name: Some("Thunder Sense #34920".to_owned()),
        rssi: Some(-61),
    }
}

/// What the next connection attempt does.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ConnectStep {
    Connect,
    Fail,
    Hang,
}

#[derive(Clone)]
pub(crate) struct FakeTransport {
    steps: Arc<Mutex<VecDeque<ConnectStep>>>,
    attempts: Arc<AtomicU32>,
    device: FakeConnection,
}

impl FakeTransport {
    pub(crate) fn new(device: FakeConnection) -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::new())),
            attempts: Arc::new(AtomicU32::new(0)),
            device,
        }
    }

    /// Queue attempt outcomes; once drained, attempts connect.
    pub(crate) fn script(self, steps: &[ConnectStep]) -> Self {
        self.steps.lock().unwrap().extend(steps.iter().copied());
        self
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn device(&self) -> &FakeConnection {
        &self.device
    }
}

impl Transport for FakeTransport {
    type Connection = FakeConnection;

    fn connect(
        &self,
        _peripheral: &PeripheralRef,
        _timeout: Duration,
    ) -> impl Future<Output = Result<FakeConnection, TransportError>> + Send {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectStep::Connect);
        let device = self.device.clone();
        async move {
            match step {
                ConnectStep::Connect => Ok(device),
                ConnectStep::Fail => Err(TransportError::new("connect", "connection refused")),
                ConnectStep::Hang => std::future::pending().await,
            }
        }
    }
}

#[derive(Default)]
struct FakeDevice {
    values: Mutex<HashMap<CharacteristicId, Vec<u8>>>,
    failing_reads: Mutex<HashSet<CharacteristicId>>,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<(CharacteristicId, Vec<u8>)>>,
    sinks: Mutex<Vec<(CharacteristicId, mpsc::Sender<Notification>)>>,
    disconnects: AtomicU32,
}

/// A board whose characteristics live in a map. Clones share state.
#[derive(Clone)]
pub(crate) struct FakeConnection {
    address: String,
    inner: Arc<FakeDevice>,
}

impl FakeConnection {
    pub(crate) fn empty() -> Self {
        Self {
            address: ADDRESS.to_owned(),
            inner: Arc::new(FakeDevice::default()),
        }
    }

    /// A board answering every registered characteristic.
    pub(crate) fn thunderboard() -> Self {
        let conn = Self::empty();
        conn.set(registry::DEVICE_NAME, b"Thunder Sense #34920\0");
        conn.set(registry::MODEL_NUMBER, b"BRD4166A");
        conn.set(registry::HARDWARE_REVISION, b"1.0");
        conn.set(registry::FIRMWARE_REVISION, b"2.2.1");
        conn.set(registry::MANUFACTURER_NAME, b"Silicon Labs");
        conn.set(registry::BATTERY_LEVEL, &[87]);
        conn.set(registry::POWER_SOURCE, &[4]);
        conn.set(registry::TEMPERATURE, &2345_i16.to_le_bytes());
        conn.set(registry::HUMIDITY, &4512_u16.to_le_bytes());
        conn.set(registry::PRESSURE, &1_013_250_u32.to_le_bytes());
        conn.set(registry::UV_INDEX, &[1]);
        conn.set(registry::SOUND_LEVEL, &4500_i16.to_le_bytes());
        conn.set(registry::AMBIENT_LIGHT, &12345_u32.to_le_bytes());
        conn.set(registry::HALL_FIELD_STRENGTH, &(-12_i32).to_le_bytes());
        conn.set(registry::RGB_LEDS, &[15, 255, 0, 0]);
        conn.set_id(
            CharacteristicId::Handle(registry::HANDLE_DIGITAL_STATE_0),
            &[1],
        );
        conn.set_id(
            CharacteristicId::Handle(registry::HANDLE_DIGITAL_STATE_1),
            &[0],
        );
        conn
    }

    pub(crate) fn set(&self, uuid: uuid::Uuid, value: &[u8]) {
        self.set_id(CharacteristicId::Uuid(uuid), value);
    }

    pub(crate) fn set_id(&self, id: CharacteristicId, value: &[u8]) {
        self.inner.values.lock().unwrap().insert(id, value.to_vec());
    }

    pub(crate) fn fail_read(&self, id: CharacteristicId) {
        self.inner.failing_reads.lock().unwrap().insert(id);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn writes(&self) -> Vec<(CharacteristicId, Vec<u8>)> {
        self.inner.writes.lock().unwrap().clone()
    }

    pub(crate) fn disconnects(&self) -> u32 {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriptions(&self) -> Vec<CharacteristicId> {
        self.inner
            .sinks
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    /// Push a value to every sink subscribed to `id`.
    pub(crate) async fn notify(&self, id: CharacteristicId, payload: &[u8]) {
        let sinks: Vec<_> = self
            .inner
            .sinks
            .lock()
            .unwrap()
            .iter()
            .filter(|(sub, _)| *sub == id)
            .map(|(_, sink)| sink.clone())
            .collect();
        for sink in sinks {
            let _ = sink
                .send(Notification {
                    id,
                    payload: payload.to_vec(),
                })
                .await;
        }
    }
}

impl Connection for FakeConnection {
    fn address(&self) -> &str {
        &self.address
    }

    fn read(
        &self,
        id: CharacteristicId,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        let failing = self.inner.failing_reads.lock().unwrap().contains(&id);
        let value = self.inner.values.lock().unwrap().get(&id).cloned();
        async move {
            tokio::task::yield_now().await;
            if failing {
                return Err(TransportError::new(format!("read {id}"), "link lost"));
            }
            value.ok_or_else(|| TransportError::new(format!("read {id}"), "not found"))
        }
    }

    fn write(
        &self,
        id: CharacteristicId,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let result = if self.inner.fail_writes.load(Ordering::SeqCst) {
            Err(TransportError::new(format!("write {id}"), "link lost"))
        } else {
            self.inner
                .writes
                .lock()
                .unwrap()
                .push((id, payload.to_vec()));
            Ok(())
        };
        async move { result }
    }

    fn subscribe(
        &self,
        id: CharacteristicId,
        sink: mpsc::Sender<Notification>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.inner.sinks.lock().unwrap().push((id, sink));
        async { Ok(()) }
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        self.inner.sinks.lock().unwrap().clear();
        async { Ok(()) }
    }
}
