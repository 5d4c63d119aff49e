//! Engine lifecycle state and load bookkeeping

use std::fmt;

use serde::Serialize;

/// Lifecycle of one widget instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    /// Transient; entered on reconfiguration or refresh after `Ready`
    Reloading,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Reloading => "reloading",
        };
        f.write_str(name)
    }
}

/// Counts gathered while loading the directory onto the map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Devices returned by the directory
    pub resolved: usize,
    /// Markers created
    pub placed: usize,
    /// Devices without a valid position
    pub skipped_without_position: usize,
    /// Devices the drawing capability refused
    pub failed: usize,
}

/// What happened to an event taken off the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The registry was updated
    Applied,
    /// Produced by a torn down generation; dropped
    Stale,
    /// Current, but nothing to do (no marker, no value, no position)
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(EngineState::Reloading.to_string(), "reloading");
        assert_eq!(
            serde_json::to_value(EngineState::Ready).unwrap(),
            serde_json::json!("ready")
        );
    }
}
