//! Drawing capability: the map renderer seen from the engine

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CapabilityError;
use crate::types::{Bounds, DeviceId, GeoPoint, LayerHandle, Level, MarkerHandle};

/// Icon of a numbered marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerIcon {
    pub marker_color: String,
    pub font_color: String,
    pub number: f64,
}

/// Label/value row of a marker popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupRow {
    pub label: String,
    pub value: String,
}

impl PopupRow {
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

/// Popup bound to a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Popup {
    /// Plain device details
    Details { rows: Vec<PopupRow> },
    /// Details plus a link to a dashboard
    Navigation {
        rows: Vec<PopupRow>,
        dashboard_id: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        tab_group: Option<Value>,
    },
}

/// Everything needed to draw a new marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub device_id: DeviceId,
    pub title: String,
    pub position: GeoPoint,
    pub icon: MarkerIcon,
    pub popup: Popup,
    /// Duration of the initial appear animation
    pub animation: Duration,
}

/// Kind of layer a level group is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    FeatureGroup,
    Cluster,
}

/// Something that can be placed inside a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerMember {
    Marker(MarkerHandle),
    Layer(LayerHandle),
}

/// Map drawing primitives
///
/// Calls are synchronous: the renderer lives on the same event loop as the
/// engine. Only `prepare` and `create_marker` can fail.
pub trait MapCanvas: Send + Sync {
    /// Render the empty map with its base tile layer
    fn prepare(&self, center: GeoPoint, min_zoom: u8) -> Result<(), CapabilityError>;

    /// Remove the map and everything drawn on it
    fn clear(&self);

    fn create_marker(&self, spec: &MarkerSpec) -> Result<MarkerHandle, CapabilityError>;

    /// Animate a marker from its current position to `to`
    fn move_marker(&self, marker: MarkerHandle, to: GeoPoint, duration: Duration);

    fn set_badge(&self, marker: MarkerHandle, value: f64);

    fn create_layer(&self, kind: LayerKind, level: Level) -> LayerHandle;

    fn add_to_layer(&self, layer: LayerHandle, member: LayerMember);

    fn remove_from_layer(&self, layer: LayerHandle, member: LayerMember);

    /// Show a layer directly on the map
    fn show_layer(&self, layer: LayerHandle);

    /// Register a layer as a base layer in the layer-switch control
    fn add_layer_control_entry(&self, layer: LayerHandle, label: &str);

    fn show_layer_control(&self);

    fn fit_bounds(&self, bounds: &Bounds, max_zoom: u8);

    /// Recompute cluster icons after a member moved
    fn refresh_cluster(&self, cluster: LayerHandle, marker: MarkerHandle);
}
