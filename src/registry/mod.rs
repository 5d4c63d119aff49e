//! Marker Registry - single source of truth for what is drawn
//!
//! Owns the device -> marker map, the level groups and the viewport bounds.
//! All drawing goes through the injected [`MapCanvas`]. Upserts are
//! idempotent per device id: a second upsert moves the existing marker
//! instead of creating another one.

mod level;
mod popup;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::capability::{LayerMember, MapCanvas, MarkerIcon, MarkerSpec};
use crate::config::{SyncSettings, WidgetConfig};
use crate::error::{MapSyncError, SyncResult};
use crate::types::{Bounds, Device, DeviceId, GeoPoint, Level, Marker};

pub use level::{LevelGroup, MarkerContainer};
pub use popup::{resolve_field, NavigationFields};

/// Rendering options derived from the widget configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryOptions {
    pub clustered: bool,
    pub max_zoom: u8,
    pub marker_color: String,
    pub font_color: String,
    pub create_animation: Duration,
    pub move_animation: Duration,
    pub default_device_type: String,
    pub navigation: NavigationFields,
}

impl RegistryOptions {
    pub fn from_config(config: &WidgetConfig, settings: &SyncSettings, app_id: Option<String>) -> Self {
        Self {
            clustered: config.is_cluster_map,
            max_zoom: config.max_zoom(),
            marker_color: config.marker_color.clone(),
            font_color: config.marker_font_color.clone(),
            create_animation: settings.create_animation,
            move_animation: settings.move_animation,
            default_device_type: settings.default_device_type.clone(),
            navigation: NavigationFields {
                dashboard_field: config.dashboard_field.clone(),
                tab_group_field: config.tab_group_field.clone(),
                app_id,
            },
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from_config(&WidgetConfig::default(), &SyncSettings::default(), None)
    }
}

/// Outcome of a successful upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Repositioned,
}

/// Device markers, level groups and viewport bounds of one map
pub struct MarkerRegistry {
    canvas: Arc<dyn MapCanvas>,
    options: RegistryOptions,
    markers: HashMap<DeviceId, Marker>,
    levels: Vec<LevelGroup>,
    bounds: Option<Bounds>,
    control_shown: bool,
}

impl MarkerRegistry {
    pub fn new(canvas: Arc<dyn MapCanvas>, options: RegistryOptions) -> Self {
        Self {
            canvas,
            options,
            markers: HashMap::new(),
            levels: Vec::new(),
            bounds: None,
            control_shown: false,
        }
    }

    /// Create the device's marker, or move it if one already exists
    ///
    /// Devices without a valid position are rejected with
    /// `MalformedDevice` and leave the registry untouched.
    pub fn upsert(&mut self, device: &Device) -> SyncResult<Upsert> {
        let point = device
            .geo_point()
            .ok_or_else(|| MapSyncError::MalformedDevice(device.id.clone()))?;

        if self.markers.contains_key(&device.id) {
            self.reposition(&device.id, point)?;
            return Ok(Upsert::Repositioned);
        }

        let spec = MarkerSpec {
            device_id: device.id.clone(),
            title: device.name.clone(),
            position: point,
            icon: MarkerIcon {
                marker_color: self.options.marker_color.clone(),
                font_color: self.options.font_color.clone(),
                number: 0.0,
            },
            popup: self
                .options
                .navigation
                .popup_for(device, &self.options.default_device_type),
            animation: self.options.create_animation,
        };
        let handle = self
            .canvas
            .create_marker(&spec)
            .map_err(|source| MapSyncError::MarkerCreation {
                id: device.id.clone(),
                source,
            })?;

        let level = device.level();
        let container = self.container_for(level);
        self.canvas
            .add_to_layer(container.marker_layer(), LayerMember::Marker(handle));
        self.extend_bounds(point);

        debug!("Marker created for {} on level {}", device.id, level);
        self.markers.insert(
            device.id.clone(),
            Marker {
                device_id: device.id.clone(),
                handle,
                title: device.name.clone(),
                position: point,
                level,
                badge: 0.0,
                clustered: container.is_clustered(),
            },
        );
        Ok(Upsert::Created)
    }

    /// Animate an existing marker to a new position and refit the viewport
    ///
    /// The marker keeps the level group it was created in, even when the
    /// device's altitude has changed since.
    pub fn reposition(&mut self, id: &DeviceId, to: GeoPoint) -> SyncResult<()> {
        if !to.is_valid() {
            return Err(MapSyncError::MalformedDevice(id.clone()));
        }
        let marker = self
            .markers
            .get_mut(id)
            .ok_or_else(|| MapSyncError::MarkerNotFound(id.clone()))?;

        self.canvas
            .move_marker(marker.handle, to, self.options.move_animation);
        marker.position = to;
        let (handle, level) = (marker.handle, marker.level);

        self.extend_bounds(to);
        self.fit_viewport();
        if let Some(MarkerContainer::Clustered { cluster, .. }) = self.find_container(level) {
            self.canvas.refresh_cluster(cluster, handle);
        }
        Ok(())
    }

    /// Replace the badge value of a marker
    ///
    /// The marker is taken out of its container and put back, since icons
    /// cannot be swapped in place while a marker sits inside a cluster.
    pub fn set_badge(&mut self, id: &DeviceId, value: f64) -> SyncResult<()> {
        let (handle, level) = self
            .markers
            .get(id)
            .map(|m| (m.handle, m.level))
            .ok_or_else(|| MapSyncError::MarkerNotFound(id.clone()))?;
        let layer = self
            .find_container(level)
            .ok_or_else(|| MapSyncError::MarkerNotFound(id.clone()))?
            .marker_layer();

        self.canvas
            .remove_from_layer(layer, LayerMember::Marker(handle));
        self.canvas.set_badge(handle, value);
        self.canvas.add_to_layer(layer, LayerMember::Marker(handle));

        if let Some(marker) = self.markers.get_mut(id) {
            marker.badge = value;
        }
        Ok(())
    }

    /// Container for a level, creating the level group on first use
    pub fn container_for(&mut self, level: Level) -> MarkerContainer {
        if let Some(container) = self.find_container(level) {
            return container;
        }
        let container =
            MarkerContainer::create(self.canvas.as_ref(), level, self.options.clustered);
        self.levels.push(LevelGroup::new(level, container));
        container
    }

    pub fn find_container(&self, level: Level) -> Option<MarkerContainer> {
        self.levels
            .iter()
            .find(|g| g.level == level)
            .map(|g| g.container)
    }

    /// Show a single level directly, or register every level with the
    /// layer-switch control when there are several
    pub fn publish_layers(&mut self) {
        match self.levels.len() {
            0 => {}
            1 => {
                let group = &mut self.levels[0];
                if !group.shown {
                    self.canvas.show_layer(group.container.group());
                    group.shown = true;
                }
            }
            _ => {
                let mut order: Vec<usize> = (0..self.levels.len()).collect();
                order.sort_by(|a, b| {
                    self.levels[*a]
                        .level
                        .partial_cmp(&self.levels[*b].level)
                        .unwrap_or(Ordering::Equal)
                });
                for idx in order {
                    let group = &mut self.levels[idx];
                    if !group.in_control {
                        self.canvas
                            .add_layer_control_entry(group.container.group(), &group.label());
                        group.in_control = true;
                    }
                }
                if !self.control_shown {
                    self.canvas.show_layer_control();
                    self.control_shown = true;
                }
            }
        }
    }

    /// Fit the viewport to the current bounds (or the origin when empty)
    pub fn fit_viewport(&self) {
        let bounds = self.bounds.unwrap_or(Bounds::point(GeoPoint::ORIGIN));
        self.canvas.fit_bounds(&bounds, self.options.max_zoom);
    }

    /// Forget all markers, level groups and bounds
    pub fn reset(&mut self) {
        self.markers.clear();
        self.levels.clear();
        self.bounds = None;
        self.control_shown = false;
    }

    /// Swap rendering options; only markers created afterwards use them
    pub fn set_options(&mut self, options: RegistryOptions) {
        self.options = options;
    }

    fn extend_bounds(&mut self, point: GeoPoint) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(point),
            None => self.bounds = Some(Bounds::point(point)),
        }
    }

    pub fn get(&self, id: &DeviceId) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.markers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Ids of all markers, sorted
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.markers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn levels(&self) -> &[LevelGroup] {
        &self.levels
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }
}
