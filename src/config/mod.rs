//! Configuration: the per-widget surface and engine-wide settings

mod settings;
mod widget;

pub use settings::{SyncSettings, C8Y_DEVICE_GROUP, C8Y_DEVICE_SUBGROUP};
pub use widget::{TargetRef, WidgetConfig, DEFAULT_MAX_ZOOM};
