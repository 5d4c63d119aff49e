//! Time helpers for measurement lookups

use chrono::{DateTime, Duration, Utc};

use crate::config::SyncSettings;
use crate::types::MeasurementWindow;

/// Window of `lookback_days` before and `lookahead_days` after `now`
pub fn measurement_window(now: DateTime<Utc>, lookback_days: i64, lookahead_days: i64) -> MeasurementWindow {
    let today = now.date_naive();
    MeasurementWindow {
        date_from: today - Duration::days(lookback_days),
        date_to: today + Duration::days(lookahead_days),
    }
}

/// Lookup window anchored at the current time
pub fn current_window(settings: &SyncSettings) -> MeasurementWindow {
    measurement_window(Utc::now(), settings.lookback_days, settings.lookahead_days)
}
