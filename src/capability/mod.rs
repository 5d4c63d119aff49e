//! External capabilities the engine calls into
//!
//! The engine never talks to a backend or a map library directly. Hosts
//! implement these traits on top of their inventory/measurement/realtime
//! clients and their map renderer.

mod canvas;
mod recorder;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::CapabilityError;
use crate::types::{Device, DeviceId, MeasurementSelector, MeasurementWindow, RealtimeMessage};

pub use canvas::{LayerKind, LayerMember, MapCanvas, MarkerIcon, MarkerSpec, Popup, PopupRow};
pub use recorder::{CanvasRecorder, DrawOp};

/// Live stream of device snapshots
pub type DeviceStream = BoxStream<'static, Result<Device, CapabilityError>>;

/// Live stream of realtime measurement notifications
pub type RealtimeStream = BoxStream<'static, Result<RealtimeMessage, CapabilityError>>;

/// One page of child assets
#[derive(Debug, Clone, Default)]
pub struct ChildPage {
    pub items: Vec<Device>,
    /// Explicit continuation flag, when the backend reports one
    pub has_more: Option<bool>,
}

impl ChildPage {
    pub fn new(items: Vec<Device>) -> Self {
        Self {
            items,
            has_more: None,
        }
    }

    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.has_more = Some(has_more);
        self
    }
}

/// Directory/inventory lookups
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Fetch a single managed object
    async fn get_target(&self, id: &DeviceId) -> Result<Device, CapabilityError>;

    /// Fetch one page (1-based) of the child assets of `id`
    async fn list_children(
        &self,
        id: &DeviceId,
        page: u32,
        page_size: usize,
    ) -> Result<ChildPage, CapabilityError>;

    /// Series names such as `"c8y_Temperature.T"`
    async fn supported_series(&self, id: &DeviceId) -> Result<Vec<String>, CapabilityError>;

    /// Measurement fragment types such as `"c8y_Temperature"`
    async fn supported_measurements(&self, id: &DeviceId) -> Result<Vec<String>, CapabilityError>;
}

/// Historical and live measurements
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Most recent record inside `window` for the selector; zero or one items
    async fn query_last(
        &self,
        source: &DeviceId,
        window: &MeasurementWindow,
        selector: &MeasurementSelector,
    ) -> Result<Vec<Value>, CapabilityError>;

    /// Realtime channel `/measurements/{source}`
    fn subscribe_realtime(&self, source: &DeviceId) -> RealtimeStream;
}

/// Live device detail updates
pub trait PositionFeed: Send + Sync {
    fn subscribe_detail(&self, id: &DeviceId) -> DeviceStream;
}
