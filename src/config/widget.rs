//! Widget configuration as stored by the dashboard

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MapSyncError, SyncResult};
use crate::types::{DeviceId, MeasurementSelector};

/// Reference to the configured target (device or group)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Configuration surface of one map widget instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default = "default_target")]
    pub device: Option<TargetRef>,
    #[serde(default)]
    pub measurement_type: MeasurementSelector,
    #[serde(default = "default_marker_color")]
    pub marker_color: String,
    #[serde(default = "default_marker_font_color")]
    pub marker_font_color: String,
    #[serde(default)]
    pub is_cluster_map: bool,
    /// Maximum zoom used when fitting the viewport; `None` keeps the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdoor_zoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_group_field: Option<String>,
}

pub const DEFAULT_MAX_ZOOM: u8 = 14;

fn default_target() -> Option<TargetRef> {
    Some(TargetRef {
        id: DeviceId::from("126"),
        name: None,
    })
}

fn default_marker_color() -> String {
    "#797bfc".to_string()
}

fn default_marker_font_color() -> String {
    "#fff".to_string()
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            device: default_target(),
            measurement_type: MeasurementSelector::default(),
            marker_color: default_marker_color(),
            marker_font_color: default_marker_font_color(),
            is_cluster_map: false,
            outdoor_zoom: None,
            dashboard_field: None,
            tab_group_field: None,
        }
    }
}

impl WidgetConfig {
    /// Parse the JSON blob a dashboard stores for the widget
    pub fn from_json(value: &Value) -> SyncResult<Self> {
        let config: WidgetConfig = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Config targeting a single device or group with everything else default
    pub fn for_target(id: impl Into<DeviceId>) -> Self {
        Self {
            device: Some(TargetRef {
                id: id.into(),
                name: None,
            }),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.measurement_type.fragment_type.is_empty() || self.measurement_type.series.is_empty()
        {
            return Err(MapSyncError::Config(
                "measurementType needs both type and name".to_string(),
            ));
        }
        Ok(())
    }

    pub fn target(&self) -> Option<&DeviceId> {
        self.device.as_ref().map(|d| &d.id)
    }

    pub fn max_zoom(&self) -> u8 {
        self.outdoor_zoom.unwrap_or(DEFAULT_MAX_ZOOM)
    }
}
