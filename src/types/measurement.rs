//! Measurement selector, realtime payloads and catalog entries

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fragment type / series pair whose value is shown as the marker badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSelector {
    #[serde(rename = "type")]
    pub fragment_type: String,
    #[serde(rename = "name")]
    pub series: String,
}

impl MeasurementSelector {
    pub fn new(fragment_type: impl Into<String>, series: impl Into<String>) -> Self {
        Self {
            fragment_type: fragment_type.into(),
            series: series.into(),
        }
    }

    /// Read `payload[fragment_type][series].value`
    pub fn extract(&self, payload: &Value) -> Option<f64> {
        payload
            .get(&self.fragment_type)?
            .get(&self.series)?
            .get("value")?
            .as_f64()
    }
}

impl Default for MeasurementSelector {
    fn default() -> Self {
        Self::new("temperature_measurement", "T")
    }
}

/// Round a measurement to the two decimals shown on a badge
pub fn round_badge(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

/// One message on a realtime measurement channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "realtimeAction")]
    pub realtime_action: String,
    #[serde(default)]
    pub data: Value,
}

impl RealtimeMessage {
    pub fn new(realtime_action: impl Into<String>, data: Value) -> Self {
        Self {
            realtime_action: realtime_action.into(),
            data,
        }
    }

    /// Badge value carried by this message, if it is a matching create event
    pub fn badge_value(&self, create_action: &str, selector: &MeasurementSelector) -> Option<f64> {
        if self.realtime_action != create_action {
            return None;
        }
        selector.extract(&self.data).map(round_badge)
    }
}

/// Date range used to look up the last known measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementWindow {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl MeasurementWindow {
    /// `YYYY-MM-DD` form used by the measurement API
    pub fn date_from_param(&self) -> String {
        self.date_from.format("%Y-%m-%d").to_string()
    }

    pub fn date_to_param(&self) -> String {
        self.date_to.format("%Y-%m-%d").to_string()
    }
}

/// Catalog entry for a measurement series a device supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentSeries {
    #[serde(rename = "type")]
    pub fragment_type: String,
    pub name: String,
    pub description: String,
}

impl FragmentSeries {
    pub fn selector(&self) -> MeasurementSelector {
        MeasurementSelector::new(&self.fragment_type, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_serializes_as_dates() {
        let window = MeasurementWindow {
            date_from: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
        };
        let value = serde_json::to_value(window).unwrap();

        assert_eq!(value, json!({"date_from": "2024-02-14", "date_to": "2024-04-15"}));
        let back: MeasurementWindow = serde_json::from_value(value).unwrap();
        assert_eq!(back, window);
    }

    #[test]
    fn test_round_badge_two_decimals() {
        assert_eq!(round_badge(23.456), 23.46);
        assert_eq!(round_badge(0.125), 0.13);
        assert_eq!(round_badge(-3.0), -3.0);
    }

    #[test]
    fn test_selector_extracts_series_value() {
        let selector = MeasurementSelector::new("c8y_Temperature", "T");
        let payload = json!({"c8y_Temperature": {"T": {"value": 21.5, "unit": "C"}}});
        assert_eq!(selector.extract(&payload), Some(21.5));
        assert_eq!(selector.extract(&json!({"c8y_Temperature": {}})), None);
    }

    #[test]
    fn test_realtime_message_requires_create_action() {
        let selector = MeasurementSelector::new("c8y_Temperature", "T");
        let data = json!({"c8y_Temperature": {"T": {"value": 23.456}}});

        let update: RealtimeMessage = serde_json::from_value(json!({
            "realtimeAction": "UPDATE",
            "data": data.clone()
        }))
        .unwrap();
        assert_eq!(update.badge_value("CREATE", &selector), None);

        let create = RealtimeMessage::new("CREATE", data);
        assert_eq!(create.badge_value("CREATE", &selector), Some(23.46));
    }
}
