//! Data types for the device map
//!
//! This module contains the core data structures shared by the resolver,
//! registry, subscription manager and engine.

mod device;
mod geo;
mod marker;
mod measurement;

pub use device::{Device, DeviceId, Position};
pub use geo::{Bounds, GeoPoint, Level};
pub use marker::{LayerHandle, Marker, MarkerHandle, SubscriptionKind};
pub use measurement::{
    round_badge, FragmentSeries, MeasurementSelector, MeasurementWindow, RealtimeMessage,
};
