//! Marker and subscription bookkeeping types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DeviceId, GeoPoint, Level};

/// Handle of a marker created by the drawing capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

/// Handle of a layer (feature group or cluster) created by the drawing capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerHandle(pub u64);

/// The on-map representation of one positioned device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub device_id: DeviceId,
    pub handle: MarkerHandle,
    pub title: String,
    pub position: GeoPoint,
    /// Level group the marker was assigned to at creation
    pub level: Level,
    /// Last known measurement value, rounded to two decimals
    pub badge: f64,
    pub clustered: bool,
}

/// Kind of realtime subscription held for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    PositionDetail,
    MeasurementRealtime,
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionKind::PositionDetail => write!(f, "position_detail"),
            SubscriptionKind::MeasurementRealtime => write!(f, "measurement_realtime"),
        }
    }
}
