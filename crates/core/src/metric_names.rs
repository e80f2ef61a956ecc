//! Canonical telemetry metric name constants.
//!
//! These are the metric names used in the `telemetry` and `threshold_rules`
//! tables, the threshold evaluation engine, and the MQTT ingestion payloads.

/// Electrical power output in kilowatts.
pub const METRIC_POWER: &str = "power_kw";

/// Exhaust gas temperature in degrees Celsius.
pub const METRIC_TEMP_EXHAUST: &str = "temp_exhaust";

/// Gas consumption in cubic metres per hour.
pub const METRIC_GAS_CONSUMPTION: &str = "gas_consumption";

/// Vibration level in millimetres per second (RMS).
pub const METRIC_VIBRATION: &str = "vibration";

/// Gas inlet pressure in bar.
pub const METRIC_GAS_PRESSURE: &str = "gas_pressure";

/// Metrics evaluated against threshold rules, in evaluation order.
///
/// The order is fixed so that sample processing is deterministic; it has no
/// effect on the derived engine status, which is the maximum severity across
/// all evaluated metrics.
pub const MONITORED_METRICS: &[&str] = &[METRIC_TEMP_EXHAUST, METRIC_VIBRATION];
