//! Headless canvas that records draw operations
//!
//! Useful for server-side snapshots of what a widget would display and for
//! asserting on the exact sequence of draw calls in tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::canvas::{LayerKind, LayerMember, MapCanvas, MarkerSpec};
use crate::error::CapabilityError;
use crate::types::{Bounds, DeviceId, GeoPoint, LayerHandle, Level, MarkerHandle};

/// One recorded call on the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Prepare { center: GeoPoint, min_zoom: u8 },
    Clear,
    CreateMarker { handle: MarkerHandle, spec: MarkerSpec },
    MoveMarker { marker: MarkerHandle, to: GeoPoint, duration: Duration },
    SetBadge { marker: MarkerHandle, value: f64 },
    CreateLayer { handle: LayerHandle, kind: LayerKind, level: Level },
    AddToLayer { layer: LayerHandle, member: LayerMember },
    RemoveFromLayer { layer: LayerHandle, member: LayerMember },
    ShowLayer { layer: LayerHandle },
    AddLayerControlEntry { layer: LayerHandle, label: String },
    ShowLayerControl,
    FitBounds { bounds: Bounds, max_zoom: u8 },
    RefreshCluster { cluster: LayerHandle, marker: MarkerHandle },
}

/// Recording implementation of [`MapCanvas`]
#[derive(Debug, Default)]
pub struct CanvasRecorder {
    ops: Mutex<Vec<DrawOp>>,
    next_handle: AtomicU64,
    fail_prepare: AtomicBool,
    reject_markers: Mutex<HashSet<DeviceId>>,
}

impl CanvasRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `prepare` fail, as if the map container could not be acquired
    pub fn fail_prepare(&self, fail: bool) {
        self.fail_prepare.store(fail, Ordering::SeqCst);
    }

    /// Make marker creation fail for one device
    pub fn reject_marker_for(&self, id: impl Into<DeviceId>) {
        self.reject_markers.lock().insert(id.into());
    }

    /// Snapshot of every recorded operation
    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.lock().clone()
    }

    /// Drain the recorded operations
    pub fn take(&self) -> Vec<DrawOp> {
        std::mem::take(&mut *self.ops.lock())
    }

    pub fn count(&self, predicate: impl Fn(&DrawOp) -> bool) -> usize {
        self.ops.lock().iter().filter(|op| predicate(op)).count()
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, op: DrawOp) {
        self.ops.lock().push(op);
    }
}

impl MapCanvas for CanvasRecorder {
    fn prepare(&self, center: GeoPoint, min_zoom: u8) -> Result<(), CapabilityError> {
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(CapabilityError::Rejected("map container unavailable".to_string()));
        }
        self.record(DrawOp::Prepare { center, min_zoom });
        Ok(())
    }

    fn clear(&self) {
        self.record(DrawOp::Clear);
    }

    fn create_marker(&self, spec: &MarkerSpec) -> Result<MarkerHandle, CapabilityError> {
        if self.reject_markers.lock().contains(&spec.device_id) {
            return Err(CapabilityError::Rejected(format!(
                "icon for {} could not be built",
                spec.device_id
            )));
        }
        let handle = MarkerHandle(self.next());
        self.record(DrawOp::CreateMarker {
            handle,
            spec: spec.clone(),
        });
        Ok(handle)
    }

    fn move_marker(&self, marker: MarkerHandle, to: GeoPoint, duration: Duration) {
        self.record(DrawOp::MoveMarker {
            marker,
            to,
            duration,
        });
    }

    fn set_badge(&self, marker: MarkerHandle, value: f64) {
        self.record(DrawOp::SetBadge { marker, value });
    }

    fn create_layer(&self, kind: LayerKind, level: Level) -> LayerHandle {
        let handle = LayerHandle(self.next());
        self.record(DrawOp::CreateLayer {
            handle,
            kind,
            level,
        });
        handle
    }

    fn add_to_layer(&self, layer: LayerHandle, member: LayerMember) {
        self.record(DrawOp::AddToLayer { layer, member });
    }

    fn remove_from_layer(&self, layer: LayerHandle, member: LayerMember) {
        self.record(DrawOp::RemoveFromLayer { layer, member });
    }

    fn show_layer(&self, layer: LayerHandle) {
        self.record(DrawOp::ShowLayer { layer });
    }

    fn add_layer_control_entry(&self, layer: LayerHandle, label: &str) {
        self.record(DrawOp::AddLayerControlEntry {
            layer,
            label: label.to_string(),
        });
    }

    fn show_layer_control(&self) {
        self.record(DrawOp::ShowLayerControl);
    }

    fn fit_bounds(&self, bounds: &Bounds, max_zoom: u8) {
        self.record(DrawOp::FitBounds {
            bounds: *bounds,
            max_zoom,
        });
    }

    fn refresh_cluster(&self, cluster: LayerHandle, marker: MarkerHandle) {
        self.record(DrawOp::RefreshCluster { cluster, marker });
    }
}
