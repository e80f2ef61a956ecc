//! Alert and engine status types shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Severity level for a metric threshold violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Value breached the warning threshold but not the critical threshold.
    Warning,
    /// Value breached the critical threshold.
    Critical,
}

impl AlertSeverity {
    /// Stable string form used in database rows and cooldown keys.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Health status of a single engine.
///
/// Ordered so that `max` picks the worst status: `Ok < Warning < Error`.
/// The ingestion pipeline overwrites this after every telemetry sample; no
/// history is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    #[default]
    Ok,
    Warning,
    Error,
}

impl EngineStatus {
    /// Stable string form used in the `engines.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EngineStatus::Ok => "ok",
            EngineStatus::Warning => "warning",
            EngineStatus::Error => "error",
        }
    }

    /// Map an alert severity to the engine status it implies.
    pub fn from_severity(severity: AlertSeverity) -> Self {
        match severity {
            AlertSeverity::Warning => EngineStatus::Warning,
            AlertSeverity::Critical => EngineStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_picks_worst() {
        assert!(EngineStatus::Ok < EngineStatus::Warning);
        assert!(EngineStatus::Warning < EngineStatus::Error);
        let worst = [EngineStatus::Warning, EngineStatus::Ok, EngineStatus::Error]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, EngineStatus::Error);
    }

    #[test]
    fn severity_maps_to_status() {
        assert_eq!(
            EngineStatus::from_severity(AlertSeverity::Warning),
            EngineStatus::Warning
        );
        assert_eq!(
            EngineStatus::from_severity(AlertSeverity::Critical),
            EngineStatus::Error
        );
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&AlertSeverity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(serde_json::to_string(&EngineStatus::Ok).unwrap(), "\"ok\"");
    }
}
