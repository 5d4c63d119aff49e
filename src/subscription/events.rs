//! Events forwarded from subscription tasks to the engine

use crate::types::{Device, DeviceId};

/// Update produced by a live subscription or a one-shot lookup
///
/// Every event carries the subscription generation it was produced under;
/// the engine drops events from earlier generations.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Device snapshot from a position-detail stream
    Position { generation: u64, device: Device },

    /// Result of the historical lookup; `None` when nothing was found or the
    /// lookup failed
    MeasurementSeeded {
        generation: u64,
        device_id: DeviceId,
        value: Option<f64>,
    },

    /// Matching realtime measurement, already rounded
    Measurement {
        generation: u64,
        device_id: DeviceId,
        value: f64,
    },
}

impl SyncEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SyncEvent::Position { generation, .. }
            | SyncEvent::MeasurementSeeded { generation, .. }
            | SyncEvent::Measurement { generation, .. } => *generation,
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        match self {
            SyncEvent::Position { device, .. } => &device.id,
            SyncEvent::MeasurementSeeded { device_id, .. }
            | SyncEvent::Measurement { device_id, .. } => device_id,
        }
    }
}
