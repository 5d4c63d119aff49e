//! Map Synchronization Engine
//!
//! Drives one widget instance: resolves the configured target, places the
//! devices through the [`MarkerRegistry`], wires their subscriptions and then
//! applies subscription events as they arrive.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --activate--> Loading --> Ready
//!                                          |  reconfigure / refresh
//!                                          v
//!                                      Reloading --> Ready
//! ```
//!
//! The engine is single-owner: every registry mutation happens through
//! `&mut self`, and events from subscriptions are pulled off one channel by
//! [`MapSyncEngine::process_next`] or [`MapSyncEngine::run_until`].

mod state;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::capability::{Inventory, MapCanvas, MeasurementSource, PositionFeed};
use crate::catalog::MeasurementCatalog;
use crate::config::{SyncSettings, WidgetConfig};
use crate::directory::DirectoryResolver;
use crate::error::{MapSyncError, SyncResult};
use crate::registry::{MarkerRegistry, RegistryOptions, Upsert};
use crate::subscription::{MeasurementRequest, SubscriptionManager, SyncEvent};
use crate::types::{Device, DeviceId, GeoPoint, SubscriptionKind};
use crate::utils::current_window;

pub use state::{EngineState, EventOutcome, LoadReport};

/// External capabilities one engine instance is wired to
#[derive(Clone)]
pub struct Capabilities {
    pub inventory: Arc<dyn Inventory>,
    pub positions: Arc<dyn PositionFeed>,
    pub measurements: Arc<dyn MeasurementSource>,
    pub canvas: Arc<dyn MapCanvas>,
}

/// Synchronization engine of one map widget
pub struct MapSyncEngine {
    config: WidgetConfig,
    settings: SyncSettings,
    state: EngineState,
    realtime: bool,
    app_id: Option<String>,
    inventory: Arc<dyn Inventory>,
    canvas: Arc<dyn MapCanvas>,
    directory: DirectoryResolver,
    registry: MarkerRegistry,
    subscriptions: SubscriptionManager,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    /// Devices that get a position stream while realtime is on
    wired: Vec<DeviceId>,
}

impl MapSyncEngine {
    /// Create an engine with default settings; realtime starts enabled
    pub fn new(capabilities: Capabilities, config: WidgetConfig) -> Self {
        Self::with_settings(capabilities, config, SyncSettings::default())
    }

    pub fn with_settings(
        capabilities: Capabilities,
        config: WidgetConfig,
        settings: SyncSettings,
    ) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let options = RegistryOptions::from_config(&config, &settings, None);

        Self {
            directory: DirectoryResolver::new(capabilities.inventory.clone(), &settings),
            registry: MarkerRegistry::new(capabilities.canvas.clone(), options),
            subscriptions: SubscriptionManager::new(
                capabilities.positions,
                capabilities.measurements,
                tx,
            ),
            inventory: capabilities.inventory,
            canvas: capabilities.canvas,
            config,
            settings,
            state: EngineState::Uninitialized,
            realtime: true,
            app_id: None,
            events,
            wired: Vec::new(),
        }
    }

    /// Application id used to pick navigation entries from device lists
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self.registry.set_options(self.registry_options());
        self
    }

    /// First activation: acquire the map and load the configured target
    ///
    /// Failing to acquire the drawing capability is the only fatal error;
    /// everything else degrades to missing markers or default badges.
    #[instrument(skip(self))]
    pub async fn activate(&mut self) -> SyncResult<LoadReport> {
        if self.state != EngineState::Uninitialized {
            return Err(MapSyncError::InvalidState(self.state.to_string()));
        }
        self.prepare_canvas()?;

        self.transition(EngineState::Loading);
        let report = self.load().await;
        self.transition(EngineState::Ready);
        Ok(report)
    }

    /// Apply a new configuration
    ///
    /// Before activation the configuration is only stored. Once `Ready` the
    /// map is torn down and rebuilt from scratch.
    pub async fn reconfigure(&mut self, config: WidgetConfig) -> SyncResult<Option<LoadReport>> {
        config.validate()?;
        self.config = config;
        self.registry.set_options(self.registry_options());

        match self.state {
            EngineState::Uninitialized => Ok(None),
            EngineState::Ready => self.reload().await.map(Some),
            other => Err(MapSyncError::InvalidState(other.to_string())),
        }
    }

    /// Rebuild the map with the current configuration
    pub async fn refresh(&mut self) -> SyncResult<LoadReport> {
        if self.state != EngineState::Ready {
            return Err(MapSyncError::InvalidState(self.state.to_string()));
        }
        self.reload().await
    }

    /// Switch live subscriptions on or off
    ///
    /// Turning realtime off closes the live streams but keeps markers and
    /// bounds. Badge lookups already running still land. Turning it back on
    /// re-wires the same devices; their first
    /// position emission is applied since nothing moved the markers in the
    /// meantime.
    pub fn set_realtime(&mut self, enabled: bool) {
        if enabled == self.realtime {
            return;
        }
        self.realtime = enabled;

        if !enabled {
            self.subscriptions.close_live();
            info!("Realtime disabled, {} markers kept", self.registry.len());
            return;
        }
        if self.state != EngineState::Ready {
            return;
        }

        for id in self.wired.clone() {
            self.subscriptions.subscribe_position(id, false);
        }
        for id in self.registry.device_ids() {
            self.enrich(id);
        }
        info!(
            "Realtime enabled, {} subscriptions open",
            self.subscriptions.len()
        );
    }

    #[instrument(skip(self))]
    async fn reload(&mut self) -> SyncResult<LoadReport> {
        self.transition(EngineState::Reloading);
        self.subscriptions.unsubscribe_all();
        self.canvas.clear();
        self.registry.reset();
        self.registry.set_options(self.registry_options());
        self.wired.clear();
        self.discard_pending();

        if let Err(e) = self.prepare_canvas() {
            self.transition(EngineState::Uninitialized);
            return Err(e);
        }

        let report = self.load().await;
        self.transition(EngineState::Ready);
        Ok(report)
    }

    fn prepare_canvas(&self) -> SyncResult<()> {
        self.canvas
            .prepare(GeoPoint::ORIGIN, self.settings.initial_min_zoom)
            .map_err(|e| {
                error!("Map could not be acquired: {}", e);
                MapSyncError::DrawingUnavailable(e)
            })
    }

    async fn load(&mut self) -> LoadReport {
        let devices = match self.config.target().cloned() {
            Some(target) => match self.directory.resolve(&target).await {
                Ok(devices) => devices,
                Err(e) => {
                    warn!("Directory resolution failed: {}", e);
                    Vec::new()
                }
            },
            None => {
                info!("No target configured");
                Vec::new()
            }
        };

        let mut report = LoadReport {
            resolved: devices.len(),
            ..Default::default()
        };
        match devices.as_slice() {
            [device] => self.wire_single(device, &mut report),
            _ => self.wire_batch(&devices, &mut report),
        }

        self.registry.fit_viewport();
        self.registry.publish_layers();
        for id in self.registry.device_ids() {
            self.enrich(id);
        }

        info!(
            "Loaded {} of {} devices ({} without position, {} failed)",
            report.placed, report.resolved, report.skipped_without_position, report.failed
        );
        report
    }

    /// A lone device is always wired, even without a position yet; its
    /// stream's first emission is applied
    fn wire_single(&mut self, device: &Device, report: &mut LoadReport) {
        self.place(device, report);
        self.wired.push(device.id.clone());
        if self.realtime {
            self.subscriptions.subscribe_position(device.id.clone(), false);
        }
    }

    /// Placed devices get a stream whose first emission (the snapshot
    /// already applied here) is skipped
    fn wire_batch(&mut self, devices: &[Device], report: &mut LoadReport) {
        for device in devices {
            if !self.place(device, report) {
                continue;
            }
            self.wired.push(device.id.clone());
            if self.realtime {
                self.subscriptions.subscribe_position(device.id.clone(), true);
            }
        }
    }

    fn place(&mut self, device: &Device, report: &mut LoadReport) -> bool {
        match self.registry.upsert(device) {
            Ok(_) => {
                report.placed += 1;
                true
            }
            Err(MapSyncError::MalformedDevice(id)) => {
                debug!("Skipping {} without position", id);
                report.skipped_without_position += 1;
                false
            }
            Err(e) => {
                warn!("{}", e);
                report.failed += 1;
                false
            }
        }
    }

    fn enrich(&mut self, id: DeviceId) {
        let request = MeasurementRequest {
            selector: self.config.measurement_type.clone(),
            window: current_window(&self.settings),
            create_action: self.settings.create_action.clone(),
            realtime: self.realtime,
        };
        self.subscriptions.subscribe_measurement(id, request);
    }

    /// Wait for the next subscription event and apply it
    ///
    /// Returns `None` once the event channel is closed.
    pub async fn process_next(&mut self) -> Option<EventOutcome> {
        let event = self.events.recv().await?;
        Some(self.apply(event))
    }

    /// Apply every event already queued, without waiting
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Apply events until `shutdown` resolves
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => None,
                event = self.events.recv() => event,
            };
            match event {
                Some(event) => {
                    self.apply(event);
                }
                None => break,
            }
        }
        debug!("Event loop stopped in state {}", self.state);
    }

    fn apply(&mut self, event: SyncEvent) -> EventOutcome {
        if !self.subscriptions.is_current(event.generation()) {
            debug!(
                "Dropping event for {} from generation {}",
                event.device_id(),
                event.generation()
            );
            return EventOutcome::Stale;
        }

        match event {
            SyncEvent::Position { device, .. } => self.apply_position(device),
            SyncEvent::MeasurementSeeded {
                device_id,
                value: Some(value),
                ..
            }
            | SyncEvent::Measurement {
                device_id, value, ..
            } => self.apply_badge(&device_id, value),
            SyncEvent::MeasurementSeeded { .. } => EventOutcome::Ignored,
        }
    }

    fn apply_position(&mut self, device: Device) -> EventOutcome {
        match self.registry.upsert(&device) {
            Ok(Upsert::Repositioned) => EventOutcome::Applied,
            Ok(Upsert::Created) => {
                debug!("Late marker for {}", device.id);
                self.registry.fit_viewport();
                self.registry.publish_layers();
                self.enrich(device.id);
                EventOutcome::Applied
            }
            Err(MapSyncError::MalformedDevice(id)) => {
                debug!("Position update of {} has no valid position", id);
                EventOutcome::Ignored
            }
            Err(e) => {
                warn!("{}", e);
                EventOutcome::Ignored
            }
        }
    }

    fn apply_badge(&mut self, id: &DeviceId, value: f64) -> EventOutcome {
        match self.registry.set_badge(id, value) {
            Ok(()) => EventOutcome::Applied,
            Err(e) => {
                debug!("Badge update dropped: {}", e);
                EventOutcome::Ignored
            }
        }
    }

    fn discard_pending(&mut self) {
        let mut dropped = 0;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Discarded {} queued events", dropped);
        }
    }

    fn transition(&mut self, next: EngineState) {
        info!("Engine {} -> {}", self.state, next);
        self.state = next;
    }

    fn registry_options(&self) -> RegistryOptions {
        RegistryOptions::from_config(&self.config, &self.settings, self.app_id.clone())
    }

    /// Catalog of measurement series supported by the configured target
    pub fn catalog(&self) -> MeasurementCatalog {
        MeasurementCatalog::new(
            self.inventory.clone(),
            self.directory.clone(),
            self.settings.default_device_type.clone(),
        )
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn marker_count(&self) -> usize {
        self.registry.len()
    }

    /// Open subscriptions, sorted by device and kind
    pub fn active_subscriptions(&self) -> Vec<(DeviceId, SubscriptionKind)> {
        self.subscriptions.active()
    }

    /// Current subscription generation; bumped on every teardown
    pub fn generation(&self) -> u64 {
        self.subscriptions.generation()
    }
}
