//! Device types as delivered by the inventory

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{GeoPoint, Level};

/// Stable, opaque identity of a managed object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Raw position fragment; every coordinate may be missing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lng: f64, alt: Option<f64>) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            alt,
        }
    }
}

/// Device (or group) snapshot from the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(rename = "c8y_Position", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Remaining fragments (navigation links, custom data)
    #[serde(flatten)]
    pub fragments: Map<String, Value>,
}

impl Device {
    /// Create a device without position or fragments
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type: None,
            position: None,
            fragments: Map::new(),
        }
    }

    pub fn with_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_fragment(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fragments.insert(key.into(), value);
        self
    }

    /// The drawable location, if lat/lng are present, finite and in range
    pub fn geo_point(&self) -> Option<GeoPoint> {
        let position = self.position?;
        let point = GeoPoint::new(position.lat?, position.lng?);
        point.is_valid().then_some(point)
    }

    /// Level (floor) derived from the altitude; missing altitude means level 0
    pub fn level(&self) -> Level {
        Level::from_altitude(self.position.and_then(|p| p.alt))
    }

    /// Device type with the configured fallback for untyped objects
    pub fn type_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.device_type.as_deref().unwrap_or(fallback)
    }

    /// Look up a top-level fragment by name
    pub fn fragment(&self, key: &str) -> Option<&Value> {
        self.fragments.get(key)
    }
}
