//! Inbound bus payload shapes and boundary validation.
//!
//! Validation failures never propagate past the pipeline: a rejected
//! message is logged at warning level and dropped.

use chrono::{DateTime, Utc};
use gridwatch_core::metric_names::{
    METRIC_GAS_CONSUMPTION, METRIC_GAS_PRESSURE, METRIC_POWER, METRIC_TEMP_EXHAUST,
    METRIC_VIBRATION,
};
use gridwatch_core::types::Timestamp;
use serde::Deserialize;

/// Raw telemetry payload from the `factory/telemetry` topic.
#[derive(Debug, Deserialize)]
pub struct TelemetryMessage {
    #[serde(default)]
    pub engine_id: Option<String>,
    /// Epoch milliseconds or an RFC 3339 string.
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub values: Option<TelemetryValues>,
}

/// Metric readings inside a telemetry payload.
///
/// Only `power` is required; absent metrics are stored as zero, matching
/// the append-only sample schema.
#[derive(Debug, Deserialize)]
pub struct TelemetryValues {
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub gas: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
    #[serde(default)]
    pub gas_pressure: Option<f64>,
}

/// Raw event payload from the `factory/events` topic.
#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub engine_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

/// Why a payload was rejected at the boundary.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing or empty engine_id")]
    MissingEngineId,
    #[error("missing numeric power value")]
    MissingPower,
    #[error("missing level")]
    MissingLevel,
    #[error("missing message")]
    MissingMessage,
    #[error("missing timestamp")]
    MissingTimestamp,
}

/// A telemetry message that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSample {
    pub engine_id: String,
    pub time: Timestamp,
    pub power_kw: f64,
    pub temp_exhaust: f64,
    pub gas_consumption: f64,
    pub vibration: f64,
    pub gas_pressure: f64,
}

impl ValidatedSample {
    /// Look up a metric reading by its canonical name.
    pub fn metric_value(&self, metric: &str) -> Option<f64> {
        match metric {
            m if m == METRIC_POWER => Some(self.power_kw),
            m if m == METRIC_TEMP_EXHAUST => Some(self.temp_exhaust),
            m if m == METRIC_GAS_CONSUMPTION => Some(self.gas_consumption),
            m if m == METRIC_VIBRATION => Some(self.vibration),
            m if m == METRIC_GAS_PRESSURE => Some(self.gas_pressure),
            _ => None,
        }
    }
}

/// An event message that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub time: Timestamp,
    pub level: String,
    pub message: String,
    pub engine_id: Option<String>,
}

/// Validate a telemetry payload.
///
/// Requires a non-empty engine id and a numeric power reading; everything
/// else defaults. A missing timestamp falls back to `now`.
pub fn validate_telemetry(
    msg: TelemetryMessage,
    now: Timestamp,
) -> Result<ValidatedSample, ValidationError> {
    let engine_id = msg
        .engine_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingEngineId)?;

    let values = msg.values.ok_or(ValidationError::MissingPower)?;
    let power_kw = values.power.ok_or(ValidationError::MissingPower)?;

    Ok(ValidatedSample {
        engine_id,
        time: parse_timestamp(msg.timestamp.as_ref(), now),
        power_kw,
        temp_exhaust: values.temp.unwrap_or(0.0),
        gas_consumption: values.gas.unwrap_or(0.0),
        vibration: values.vibration.unwrap_or(0.0),
        gas_pressure: values.gas_pressure.unwrap_or(0.0),
    })
}

/// Validate an event payload.
///
/// Level and message must be present; the level itself is stored verbatim
/// (unknown levels are accepted at ingestion).
pub fn validate_event(msg: EventMessage, now: Timestamp) -> Result<ValidatedEvent, ValidationError> {
    let level = msg
        .level
        .filter(|l| !l.is_empty())
        .ok_or(ValidationError::MissingLevel)?;
    let message = msg
        .message
        .filter(|m| !m.is_empty())
        .ok_or(ValidationError::MissingMessage)?;
    let timestamp = msg.timestamp.ok_or(ValidationError::MissingTimestamp)?;

    Ok(ValidatedEvent {
        time: parse_timestamp(Some(&timestamp), now),
        level,
        message,
        engine_id: msg.engine_id,
    })
}

/// Interpret a payload timestamp: epoch milliseconds or RFC 3339.
///
/// Anything unparseable falls back to `now` so a clock-skewed producer
/// cannot poison the time series with nulls.
fn parse_timestamp(value: Option<&serde_json::Value>, now: Timestamp) -> Timestamp {
    match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(now),
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now),
        _ => now,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn parse(json: &str) -> TelemetryMessage {
        serde_json::from_str(json).expect("test payload parses")
    }

    #[test]
    fn accepts_a_complete_payload() {
        let msg = parse(
            r#"{"engine_id": "gpu-2", "timestamp": 1700000000000,
                "values": {"power": 1100.0, "temp": 460.5, "gas": 290.0,
                           "vibration": 4.2, "gas_pressure": 3.1}}"#,
        );
        let sample = validate_telemetry(msg, Utc::now()).expect("valid");

        assert_eq!(sample.engine_id, "gpu-2");
        assert_eq!(sample.power_kw, 1100.0);
        assert_eq!(sample.temp_exhaust, 460.5);
        assert_eq!(sample.time.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        let msg = parse(r#"{"engine_id": "gpu-1", "values": {"power": 900.0}}"#);
        let sample = validate_telemetry(msg, Utc::now()).expect("valid");

        assert_eq!(sample.temp_exhaust, 0.0);
        assert_eq!(sample.vibration, 0.0);
    }

    #[test]
    fn rejects_missing_engine_id() {
        let msg = parse(r#"{"values": {"power": 900.0}}"#);
        assert_matches!(
            validate_telemetry(msg, Utc::now()),
            Err(ValidationError::MissingEngineId)
        );
    }

    #[test]
    fn rejects_blank_engine_id() {
        let msg = parse(r#"{"engine_id": "  ", "values": {"power": 900.0}}"#);
        assert_matches!(
            validate_telemetry(msg, Utc::now()),
            Err(ValidationError::MissingEngineId)
        );
    }

    #[test]
    fn rejects_missing_power() {
        let msg = parse(r#"{"engine_id": "gpu-1", "values": {"temp": 400.0}}"#);
        assert_matches!(
            validate_telemetry(msg, Utc::now()),
            Err(ValidationError::MissingPower)
        );

        let msg = parse(r#"{"engine_id": "gpu-1"}"#);
        assert_matches!(
            validate_telemetry(msg, Utc::now()),
            Err(ValidationError::MissingPower)
        );
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let msg = parse(
            r#"{"engine_id": "gpu-1", "timestamp": "2026-08-07T10:15:00Z",
                "values": {"power": 900.0}}"#,
        );
        let sample = validate_telemetry(msg, Utc::now()).expect("valid");
        assert_eq!(sample.time.to_rfc3339(), "2026-08-07T10:15:00+00:00");
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let now = Utc::now();
        let msg = parse(
            r#"{"engine_id": "gpu-1", "timestamp": "yesterday-ish",
                "values": {"power": 900.0}}"#,
        );
        let sample = validate_telemetry(msg, now).expect("valid");
        assert_eq!(sample.time, now);
    }

    #[test]
    fn metric_lookup_by_canonical_name() {
        let msg = parse(
            r#"{"engine_id": "gpu-1",
                "values": {"power": 900.0, "temp": 480.0, "vibration": 11.5}}"#,
        );
        let sample = validate_telemetry(msg, Utc::now()).expect("valid");

        assert_eq!(sample.metric_value(METRIC_TEMP_EXHAUST), Some(480.0));
        assert_eq!(sample.metric_value(METRIC_VIBRATION), Some(11.5));
        assert_eq!(sample.metric_value("unknown"), None);
    }

    #[test]
    fn event_requires_level_message_and_timestamp() {
        let now = Utc::now();

        let valid: EventMessage = serde_json::from_str(
            r#"{"level": "fault", "message": "misfire detected",
                "engine_id": "gpu-3", "timestamp": 1700000000000}"#,
        )
        .unwrap();
        let event = validate_event(valid, now).expect("valid");
        // Unknown levels are stored verbatim.
        assert_eq!(event.level, "fault");

        let missing: EventMessage =
            serde_json::from_str(r#"{"message": "m", "timestamp": 1}"#).unwrap();
        assert_matches!(
            validate_event(missing, now),
            Err(ValidationError::MissingLevel)
        );

        let missing: EventMessage =
            serde_json::from_str(r#"{"level": "info", "message": "m"}"#).unwrap();
        assert_matches!(
            validate_event(missing, now),
            Err(ValidationError::MissingTimestamp)
        );
    }
}
