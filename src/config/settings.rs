//! Runtime constants of the engine
//!
//! Defaults match the dashboard widget; a handful can be overridden through
//! environment variables for slow backends or tests.

use std::env;
use std::time::Duration;

pub const C8Y_DEVICE_GROUP: &str = "c8y_DeviceGroup";
pub const C8Y_DEVICE_SUBGROUP: &str = "c8y_DeviceSubgroup";

/// Tunables that are not part of the per-widget configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Page size used when listing child assets
    pub page_size: usize,
    /// Type tags that mark an object as a group
    pub group_types: Vec<String>,
    /// Animation used when a marker first appears
    pub create_animation: Duration,
    /// Animation used when a marker moves
    pub move_animation: Duration,
    /// Days before now searched for the last measurement
    pub lookback_days: i64,
    /// Days after now searched for the last measurement
    pub lookahead_days: i64,
    /// Zoom the map is rendered with before the first fit
    pub initial_min_zoom: u8,
    /// Realtime action tag of newly created measurements
    pub create_action: String,
    /// Type assigned to devices the inventory returns untyped
    pub default_device_type: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            group_types: vec![C8Y_DEVICE_GROUP.to_string(), C8Y_DEVICE_SUBGROUP.to_string()],
            create_animation: Duration::from_millis(1000),
            move_animation: Duration::from_millis(2000),
            lookback_days: 30,
            lookahead_days: 31,
            initial_min_zoom: 3,
            create_action: "CREATE".to_string(),
            default_device_type: "default".to_string(),
        }
    }
}

impl SyncSettings {
    /// Defaults with overrides from `MAP_SYNC_*` environment variables
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(page_size) = env_parse::<usize>("MAP_SYNC_PAGE_SIZE").filter(|n| *n > 0) {
            settings.page_size = page_size;
        }
        if let Some(ms) = env_parse::<u64>("MAP_SYNC_MOVE_ANIMATION_MS") {
            settings.move_animation = Duration::from_millis(ms);
        }
        if let Some(days) = env_parse::<i64>("MAP_SYNC_LOOKBACK_DAYS") {
            settings.lookback_days = days;
        }
        if let Some(days) = env_parse::<i64>("MAP_SYNC_LOOKAHEAD_DAYS") {
            settings.lookahead_days = days;
        }

        settings
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn is_group_type(&self, device_type: &str) -> bool {
        self.group_types.iter().any(|t| t == device_type)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
