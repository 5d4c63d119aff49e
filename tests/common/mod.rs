//! In-memory capabilities shared by the integration suites
//!
//! Position and realtime streams are backed by unbounded channels so tests
//! decide exactly when something is emitted. Historical lookups can be held
//! back per device to inject delays.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

use device_map_sync::capability::{DeviceStream, RealtimeStream};
use device_map_sync::types::{MeasurementWindow, RealtimeMessage};
use device_map_sync::{
    CanvasRecorder, Capabilities, CapabilityError, ChildPage, Device, DeviceId, Inventory,
    MapSyncEngine, MeasurementSelector, MeasurementSource, Position, PositionFeed, WidgetConfig,
};

pub const GROUP_TYPE: &str = "c8y_DeviceGroup";

/// Inventory backed by maps; children are served in pages
#[derive(Default)]
pub struct FakeInventory {
    objects: HashMap<DeviceId, Device>,
    children: HashMap<DeviceId, Vec<Device>>,
    failing: HashSet<DeviceId>,
    series: HashMap<DeviceId, Vec<String>>,
    measurements: HashMap<DeviceId, Vec<String>>,
    page_requests: Mutex<Vec<(DeviceId, u32)>>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.objects.insert(device.id.clone(), device);
        self
    }

    /// Register a group and its direct children
    pub fn with_group(mut self, id: &str, children: Vec<Device>) -> Self {
        let group = Device::new(id, format!("group {id}")).with_type(GROUP_TYPE);
        for child in &children {
            self.objects.insert(child.id.clone(), child.clone());
        }
        self.objects.insert(group.id.clone(), group);
        self.children.insert(DeviceId::from(id), children);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(DeviceId::from(id));
        self
    }

    pub fn with_series(mut self, id: &str, series: &[&str], measurements: &[&str]) -> Self {
        let id = DeviceId::from(id);
        self.series
            .insert(id.clone(), series.iter().map(|s| s.to_string()).collect());
        self.measurements
            .insert(id, measurements.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Every `(group, page)` requested so far
    pub fn page_requests(&self) -> Vec<(DeviceId, u32)> {
        self.page_requests.lock().clone()
    }

    fn check(&self, id: &DeviceId) -> Result<(), CapabilityError> {
        if self.failing.contains(id) {
            return Err(CapabilityError::Status { code: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    async fn get_target(&self, id: &DeviceId) -> Result<Device, CapabilityError> {
        self.check(id)?;
        self.objects
            .get(id)
            .cloned()
            .ok_or_else(|| CapabilityError::NotFound(id.clone()))
    }

    async fn list_children(
        &self,
        id: &DeviceId,
        page: u32,
        page_size: usize,
    ) -> Result<ChildPage, CapabilityError> {
        self.page_requests.lock().push((id.clone(), page));
        self.check(id)?;
        let all = self.children.get(id).cloned().unwrap_or_default();
        let items = all
            .into_iter()
            .skip((page as usize - 1) * page_size)
            .take(page_size)
            .collect();
        Ok(ChildPage::new(items))
    }

    async fn supported_series(&self, id: &DeviceId) -> Result<Vec<String>, CapabilityError> {
        self.check(id)?;
        Ok(self.series.get(id).cloned().unwrap_or_default())
    }

    async fn supported_measurements(&self, id: &DeviceId) -> Result<Vec<String>, CapabilityError> {
        self.check(id)?;
        Ok(self.measurements.get(id).cloned().unwrap_or_default())
    }
}

/// Fan-out of channel senders per device
struct Channels<T> {
    senders: Mutex<HashMap<DeviceId, Vec<mpsc::UnboundedSender<T>>>>,
    opened: Mutex<HashMap<DeviceId, usize>>,
}

impl<T> Default for Channels<T> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            opened: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + 'static> Channels<T> {
    fn open(&self, id: &DeviceId) -> UnboundedReceiverStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().entry(id.clone()).or_default().push(tx);
        *self.opened.lock().entry(id.clone()).or_default() += 1;
        UnboundedReceiverStream::new(rx)
    }

    /// Deliver to every open stream of the device; returns how many got it
    fn emit(&self, id: &DeviceId, item: T) -> usize {
        let mut senders = self.senders.lock();
        let Some(list) = senders.get_mut(id) else {
            return 0;
        };
        list.retain(|tx| !tx.is_closed());
        list.iter().filter(|tx| tx.send(item.clone()).is_ok()).count()
    }

    fn opened(&self, id: &DeviceId) -> usize {
        self.opened.lock().get(id).copied().unwrap_or(0)
    }

    fn live(&self, id: &DeviceId) -> usize {
        self.senders
            .lock()
            .get(id)
            .map(|list| list.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

/// Position-detail feed driven by the test
#[derive(Default)]
pub struct FakePositions {
    channels: Channels<Result<Device, CapabilityError>>,
}

impl FakePositions {
    pub fn emit(&self, device: Device) -> usize {
        let id = device.id.clone();
        self.channels.emit(&id, Ok(device))
    }

    pub fn fail(&self, id: &str) -> usize {
        self.channels.emit(
            &DeviceId::from(id),
            Err(CapabilityError::Transport("connection reset".to_string())),
        )
    }

    pub fn opened(&self, id: &str) -> usize {
        self.channels.opened(&DeviceId::from(id))
    }

    pub fn live(&self, id: &str) -> usize {
        self.channels.live(&DeviceId::from(id))
    }
}

impl PositionFeed for FakePositions {
    fn subscribe_detail(&self, id: &DeviceId) -> DeviceStream {
        self.channels.open(id).boxed()
    }
}

/// Measurement capability with scripted seeds and a test-driven realtime channel
#[derive(Default)]
pub struct FakeMeasurements {
    seeds: Mutex<HashMap<DeviceId, Result<Vec<Value>, CapabilityError>>>,
    gates: Mutex<HashMap<DeviceId, oneshot::Receiver<()>>>,
    queries: Mutex<Vec<(DeviceId, MeasurementWindow, MeasurementSelector)>>,
    realtime: Channels<Result<RealtimeMessage, CapabilityError>>,
}

impl FakeMeasurements {
    /// Last record returned by the historical lookup
    pub fn seed(&self, id: &str, record: Value) {
        self.seeds
            .lock()
            .insert(DeviceId::from(id), Ok(vec![record]));
    }

    pub fn seed_error(&self, id: &str, error: CapabilityError) {
        self.seeds.lock().insert(DeviceId::from(id), Err(error));
    }

    /// Hold the next lookup of `id` until the returned sender fires
    pub fn hold(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(DeviceId::from(id), rx);
        tx
    }

    pub fn push(&self, id: &str, message: RealtimeMessage) -> usize {
        self.realtime.emit(&DeviceId::from(id), Ok(message))
    }

    pub fn realtime_opened(&self, id: &str) -> usize {
        self.realtime.opened(&DeviceId::from(id))
    }

    pub fn queries(&self) -> Vec<(DeviceId, MeasurementWindow, MeasurementSelector)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl MeasurementSource for FakeMeasurements {
    async fn query_last(
        &self,
        source: &DeviceId,
        window: &MeasurementWindow,
        selector: &MeasurementSelector,
    ) -> Result<Vec<Value>, CapabilityError> {
        self.queries
            .lock()
            .push((source.clone(), *window, selector.clone()));
        let gate = self.gates.lock().remove(source);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.seeds
            .lock()
            .get(source)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn subscribe_realtime(&self, source: &DeviceId) -> RealtimeStream {
        self.realtime.open(source).boxed()
    }
}

/// All fakes plus a recording canvas
pub struct Harness {
    pub inventory: Arc<FakeInventory>,
    pub positions: Arc<FakePositions>,
    pub measurements: Arc<FakeMeasurements>,
    pub canvas: Arc<CanvasRecorder>,
}

impl Harness {
    pub fn new(inventory: FakeInventory) -> Self {
        Self {
            inventory: Arc::new(inventory),
            positions: Arc::new(FakePositions::default()),
            measurements: Arc::new(FakeMeasurements::default()),
            canvas: Arc::new(CanvasRecorder::new()),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            inventory: self.inventory.clone(),
            positions: self.positions.clone(),
            measurements: self.measurements.clone(),
            canvas: self.canvas.clone(),
        }
    }

    pub fn engine(&self, config: WidgetConfig) -> MapSyncEngine {
        MapSyncEngine::new(self.capabilities(), config)
    }
}

pub fn device_at(id: &str, lat: f64, lng: f64, alt: Option<f64>) -> Device {
    Device::new(id, format!("device {id}"))
        .with_type("c8y_Tracker")
        .with_position(Position::new(lat, lng, alt))
}

pub fn unpositioned(id: &str) -> Device {
    Device::new(id, format!("device {id}")).with_type("c8y_Tracker")
}

/// Payload carrying `value` under the default selector
pub fn temperature(value: f64) -> Value {
    json!({"temperature_measurement": {"T": {"value": value, "unit": "C"}}})
}

/// Let subscription tasks run, then apply whatever they produced
pub async fn settle(engine: &mut MapSyncEngine) -> usize {
    let mut applied = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let processed = engine.process_pending();
        if processed == 0 {
            return applied;
        }
        applied += processed;
    }
}
