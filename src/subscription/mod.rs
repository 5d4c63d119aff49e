//! Subscription Manager - owns every realtime subscription of a widget
//!
//! Each subscription runs as a Tokio task that forwards into the engine's
//! event channel. Tasks are aborted on teardown and every event is stamped
//! with the generation it was started under, so late deliveries from a torn
//! down generation can be recognised and dropped.

mod events;

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::capability::{MeasurementSource, PositionFeed};
use crate::error::MapSyncError;
use crate::types::{
    round_badge, DeviceId, MeasurementSelector, MeasurementWindow, SubscriptionKind,
};

pub use events::SyncEvent;

/// Parameters of a measurement subscription
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRequest {
    pub selector: MeasurementSelector,
    pub window: MeasurementWindow,
    /// Realtime action tag that marks a new measurement
    pub create_action: String,
    /// Follow the historical lookup with a live subscription
    pub realtime: bool,
}

/// One open subscription
#[derive(Debug)]
struct SubscriptionRecord {
    handle: JoinHandle<()>,
}

/// Open subscriptions of one engine, keyed by device and kind
pub struct SubscriptionManager {
    positions: Arc<dyn PositionFeed>,
    measurements: Arc<dyn MeasurementSource>,
    tx: mpsc::UnboundedSender<SyncEvent>,
    records: HashMap<(DeviceId, SubscriptionKind), SubscriptionRecord>,
    /// One-shot lookups running without a live follow-up
    lookups: Vec<JoinHandle<()>>,
    generation: u64,
}

impl SubscriptionManager {
    pub fn new(
        positions: Arc<dyn PositionFeed>,
        measurements: Arc<dyn MeasurementSource>,
        tx: mpsc::UnboundedSender<SyncEvent>,
    ) -> Self {
        Self {
            positions,
            measurements,
            tx,
            records: HashMap::new(),
            lookups: Vec::new(),
            generation: 0,
        }
    }

    /// Open the live position-detail stream of a device
    ///
    /// With `skip_first` the first snapshot is dropped, for devices whose
    /// initial position was already applied. An existing position stream of
    /// the same device is replaced. Stream errors are logged; the stream
    /// stays open until torn down.
    pub fn subscribe_position(&mut self, id: DeviceId, skip_first: bool) {
        let generation = self.generation;
        let tx = self.tx.clone();
        let mut stream = self.positions.subscribe_detail(&id);
        let device_id = id.clone();

        let handle = tokio::spawn(async move {
            let mut skip = skip_first;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(device) => {
                        if skip {
                            skip = false;
                            debug!("Ignoring initial snapshot of {}", device_id);
                            continue;
                        }
                        if tx.send(SyncEvent::Position { generation, device }).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Position stream of {} reported: {}", device_id, e),
                }
            }
            debug!("Position stream of {} ended", device_id);
        });

        self.insert(id, SubscriptionKind::PositionDetail, handle);
    }

    /// Seed the badge from history, then optionally follow live measurements
    ///
    /// The historical lookup always finishes (with or without a value)
    /// before the live channel is opened, so a stale lookup can never
    /// overwrite a newer live value. The lookup runs as its own task so
    /// closing the live side leaves it running.
    pub fn subscribe_measurement(&mut self, id: DeviceId, request: MeasurementRequest) {
        let generation = self.generation;
        let MeasurementRequest {
            selector,
            window,
            create_action,
            realtime,
        } = request;
        let (seeded_tx, seeded_rx) = oneshot::channel::<()>();

        let tx = self.tx.clone();
        let source = self.measurements.clone();
        let device_id = id.clone();
        let lookup_selector = selector.clone();
        let lookup = tokio::spawn(async move {
            let selector = lookup_selector;
            let value = match source.query_last(&device_id, &window, &selector).await {
                Ok(records) => records
                    .first()
                    .map(|record| selector.extract(record).map(round_badge).unwrap_or(0.0)),
                Err(e) => {
                    let err = MapSyncError::MeasurementFailure {
                        id: device_id.clone(),
                        source: e,
                    };
                    warn!("{}", err);
                    None
                }
            };
            let seeded = SyncEvent::MeasurementSeeded {
                generation,
                device_id,
                value,
            };
            if tx.send(seeded).is_ok() {
                let _ = seeded_tx.send(());
            }
        });
        self.lookups.retain(|h| !h.is_finished());
        self.lookups.push(lookup);

        if !realtime {
            return;
        }

        let tx = self.tx.clone();
        let source = self.measurements.clone();
        let device_id = id.clone();
        let live = tokio::spawn(async move {
            if seeded_rx.await.is_err() {
                return;
            }
            let mut stream = source.subscribe_realtime(&device_id);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(message) => {
                        let Some(value) = message.badge_value(&create_action, &selector) else {
                            continue;
                        };
                        let event = SyncEvent::Measurement {
                            generation,
                            device_id: device_id.clone(),
                            value,
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Measurement channel of {} reported: {}", device_id, e),
                }
            }
        });

        self.insert(id, SubscriptionKind::MeasurementRealtime, live);
    }

    /// Close the live streams but let pending lookups deliver
    ///
    /// The generation is kept, so seeds still in flight are applied.
    pub fn close_live(&mut self) {
        let closed = self.records.len();
        for (_, record) in self.records.drain() {
            record.handle.abort();
        }
        debug!(
            "Closed {} live subscriptions, {} lookups left running",
            closed,
            self.lookups.iter().filter(|h| !h.is_finished()).count()
        );
    }

    /// Close every subscription and start a new generation
    pub fn unsubscribe_all(&mut self) {
        let closed = self.records.len();
        for (_, record) in self.records.drain() {
            record.handle.abort();
        }
        for lookup in self.lookups.drain(..) {
            lookup.abort();
        }
        self.generation += 1;
        debug!(
            "Closed {} subscriptions, generation now {}",
            closed, self.generation
        );
    }

    fn insert(&mut self, id: DeviceId, kind: SubscriptionKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.records.insert((id, kind), SubscriptionRecord { handle }) {
            previous.handle.abort();
        }
    }

    /// Generation new subscriptions are stamped with
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Open subscriptions as sorted (device, kind) pairs
    pub fn active(&self) -> Vec<(DeviceId, SubscriptionKind)> {
        let mut active: Vec<_> = self.records.keys().cloned().collect();
        active.sort();
        active
    }

    pub fn has(&self, id: &DeviceId, kind: SubscriptionKind) -> bool {
        self.records.contains_key(&(id.clone(), kind))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        for record in self.records.values() {
            record.handle.abort();
        }
        for lookup in &self.lookups {
            lookup.abort();
        }
    }
}
