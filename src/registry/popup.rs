//! Marker popups and dashboard navigation fields

use serde_json::Value;

use crate::capability::{Popup, PopupRow};
use crate::types::Device;

/// Where navigation links are read from on a device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationFields {
    /// Path like `"c8y_Dashboard.id"` or `"deviceListDynamicDashboards.dashboardId"`
    pub dashboard_field: Option<String>,
    pub tab_group_field: Option<String>,
    /// Application the widget runs in; preferred when a field holds a list
    pub app_id: Option<String>,
}

impl NavigationFields {
    /// Build the popup for a freshly created marker
    pub fn popup_for(&self, device: &Device, default_type: &str) -> Popup {
        let rows = vec![
            PopupRow::new("Name:", device.name.clone()),
            PopupRow::new("ID:", device.id.to_string()),
            PopupRow::new("Type:", device.type_or(default_type)),
        ];

        let app_id = self.app_id.as_deref();
        let dashboard_id = self
            .dashboard_field
            .as_deref()
            .and_then(|path| resolve_field(path, device, app_id));

        match dashboard_id {
            Some(dashboard_id) => Popup::Navigation {
                rows,
                dashboard_id,
                tab_group: self
                    .tab_group_field
                    .as_deref()
                    .and_then(|path| resolve_field(path, device, app_id)),
            },
            None => Popup::Details { rows },
        }
    }
}

/// Resolve a one- or two-segment field path on a device
///
/// For `"a.b"` where `a` is a list, the entry whose `appId` matches the
/// current application wins, otherwise the first entry is used.
pub fn resolve_field(path: &str, device: &Device, app_id: Option<&str>) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let head = top_level(device, segments[0])?;

    let value = if segments.len() == 2 {
        match &head {
            Value::Array(items) => {
                let entry = app_id
                    .and_then(|app| {
                        items
                            .iter()
                            .find(|item| item.get("appId").and_then(Value::as_str) == Some(app))
                    })
                    .or_else(|| items.first())?;
                entry.get(segments[1]).cloned()
            }
            _ => head.get(segments[1]).cloned(),
        }
    } else {
        Some(head)
    };

    value.filter(|v| !v.is_null())
}

fn top_level(device: &Device, key: &str) -> Option<Value> {
    match key {
        "id" => Some(Value::String(device.id.to_string())),
        "name" => Some(Value::String(device.name.clone())),
        "type" => device.device_type.clone().map(Value::String),
        _ => device.fragment(key).cloned(),
    }
}
