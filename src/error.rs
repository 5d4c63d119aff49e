//! Error types for the map synchronization engine
//!
//! `CapabilityError` is what the external capabilities (inventory,
//! measurements, realtime, drawing) report. `MapSyncError` is the engine's
//! own taxonomy; almost all of it degrades to a missing marker or a default
//! badge instead of reaching the user.

use thiserror::Error;

use crate::types::DeviceId;

/// Result type for engine operations
pub type SyncResult<T> = Result<T, MapSyncError>;

/// Failure reported by an external capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("object {0} not found")]
    NotFound(DeviceId),

    #[error("request failed with status {code}")]
    Status { code: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("drawing capability rejected the operation: {0}")]
    Rejected(String),
}

/// Errors produced by the engine and its components
#[derive(Error, Debug)]
pub enum MapSyncError {
    /// Directory or device detail fetch failed
    #[error("lookup of {id} failed: {source}")]
    LookupFailure {
        id: DeviceId,
        #[source]
        source: CapabilityError,
    },

    /// Historical measurement fetch failed
    #[error("measurement lookup for {id} failed: {source}")]
    MeasurementFailure {
        id: DeviceId,
        #[source]
        source: CapabilityError,
    },

    /// Device lacks a drawable position
    #[error("device {0} has no valid position")]
    MalformedDevice(DeviceId),

    /// Drawing capability failed while constructing a marker
    #[error("marker for {id} could not be created: {source}")]
    MarkerCreation {
        id: DeviceId,
        #[source]
        source: CapabilityError,
    },

    /// The map itself could not be acquired
    #[error("drawing capability unavailable: {0}")]
    DrawingUnavailable(#[source] CapabilityError),

    #[error("no marker registered for {0}")]
    MarkerNotFound(DeviceId),

    #[error("operation not allowed while {0}")]
    InvalidState(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MapSyncError {
    /// True for failures that only cost a marker or a badge
    pub fn is_degradable(&self) -> bool {
        !matches!(
            self,
            MapSyncError::DrawingUnavailable(_)
                | MapSyncError::InvalidState(_)
                | MapSyncError::Config(_)
                | MapSyncError::Json(_)
        )
    }
}
