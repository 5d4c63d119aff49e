//! Device Map Sync
//!
//! Keeps a dashboard map of devices in step with the inventory: one marker
//! per positioned device, grouped by level (altitude), optionally clustered,
//! with a live measurement badge and live position updates.
//!
//! # Features
//!
//! - **Directory expansion**: devices, groups and nested subgroups, paginated
//! - **Idempotent markers**: one marker per device, repositioned in place
//! - **Level groups**: one layer per altitude, layer switch for several levels
//! - **Realtime**: position and measurement streams with generation-checked teardown
//! - **Headless**: all drawing goes through the `MapCanvas` trait
//!
//! # Modules
//!
//! - `types`: Core data structures (Device, Marker, Bounds, Level)
//! - `capability`: Traits for inventory, measurements, positions and drawing
//! - `config`: Widget configuration and engine settings
//! - `directory`: Target to device-list resolution
//! - `catalog`: Supported measurement series discovery
//! - `registry`: Marker, level group and bounds ownership
//! - `subscription`: Realtime subscription lifecycle
//! - `engine`: The synchronization state machine
//! - `utils`: Utility functions (measurement windows)
//!
//! # Example
//!
//! ```no_run
//! use device_map_sync::{Capabilities, MapSyncEngine, WidgetConfig};
//!
//! async fn show(capabilities: Capabilities) -> device_map_sync::SyncResult<()> {
//!     let mut engine = MapSyncEngine::new(capabilities, WidgetConfig::for_target("4711"));
//!     let report = engine.activate().await?;
//!     println!("{} markers placed", report.placed);
//!     engine
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod registry;
pub mod subscription;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use capability::{
    CanvasRecorder, ChildPage, DrawOp, Inventory, MapCanvas, MeasurementSource, PositionFeed,
};
pub use catalog::MeasurementCatalog;
pub use config::{SyncSettings, WidgetConfig};
pub use directory::DirectoryResolver;
pub use engine::{Capabilities, EngineState, EventOutcome, LoadReport, MapSyncEngine};
pub use error::{CapabilityError, MapSyncError, SyncResult};
pub use registry::{MarkerRegistry, RegistryOptions};
pub use subscription::{SubscriptionManager, SyncEvent};
pub use types::{
    Bounds, Device, DeviceId, FragmentSeries, GeoPoint, Level, Marker, MeasurementSelector,
    Position, SubscriptionKind,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
