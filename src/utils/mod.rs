//! Utility functions and helpers

pub mod time;

pub use time::{current_window, measurement_window};
