//! Alert lifecycle manager: turns metric evaluations into alert creation,
//! suppression, or resolution.
//!
//! Owns the process-local cooldown table. Persistence failures are logged
//! and the sample's remaining metrics keep processing; a single failed
//! alert write is never retried.

use std::sync::Mutex;

use gridwatch_core::thresholds::{cooldown_key, CooldownTracker, MetricEval};
use gridwatch_core::types::Timestamp;
use gridwatch_core::AlertSeverity;
use gridwatch_core::metric_names::{METRIC_TEMP_EXHAUST, METRIC_VIBRATION};
use gridwatch_db::models::alert::CreateAlert;
use gridwatch_db::repositories::AlertRepo;
use gridwatch_db::DbPool;

/// Drives the alert state machine for each (engine, metric) pair.
pub struct AlertLifecycleManager {
    pool: DbPool,
    cooldown: Mutex<CooldownTracker>,
}

impl AlertLifecycleManager {
    pub fn new(pool: DbPool, cooldown_window: chrono::Duration) -> Self {
        Self {
            pool,
            cooldown: Mutex::new(CooldownTracker::new(cooldown_window)),
        }
    }

    /// Apply one metric evaluation outcome.
    ///
    /// - Breach outside the cooldown window: create an active alert and
    ///   record the cooldown timestamp.
    /// - Breach inside the window: suppressed, nothing written.
    /// - Normal: unconditionally resolve any active alert for the
    ///   (engine, metric) pair, whatever its severity. Runs on every normal
    ///   sample, not just transitions, so the system self-heals after a
    ///   missed transition; resolving nothing is a no-op.
    pub async fn apply(
        &self,
        engine_id: &str,
        metric: &str,
        value: f64,
        eval: MetricEval,
        now: Timestamp,
    ) {
        match eval {
            MetricEval::Normal => {
                match AlertRepo::resolve_active_for_metric(&self.pool, engine_id, metric).await {
                    Ok(0) => {}
                    Ok(resolved) => {
                        tracing::info!(engine_id, metric, resolved, "Auto-resolved alerts");
                    }
                    Err(e) => {
                        tracing::error!(engine_id, metric, error = %e, "Alert auto-resolve failed");
                    }
                }
            }
            MetricEval::Breach {
                severity,
                threshold_value,
            } => {
                let key = cooldown_key(engine_id, metric, severity);
                let fire = self
                    .cooldown
                    .lock()
                    .expect("cooldown mutex poisoned")
                    .should_fire(&key, now);
                if !fire {
                    tracing::debug!(engine_id, metric, severity = severity.as_str(), "Alert suppressed by cooldown");
                    return;
                }

                let alert = CreateAlert {
                    engine_id: engine_id.to_string(),
                    metric: metric.to_string(),
                    severity: severity.as_str().to_string(),
                    title: alert_title(metric, severity),
                    message: format!(
                        "{metric} value {value:.1} exceeds {} threshold of {threshold_value}",
                        severity.as_str()
                    ),
                    actual_value: value,
                    threshold_value,
                };

                match AlertRepo::insert(&self.pool, &alert).await {
                    Ok(created) => {
                        tracing::info!(
                            engine_id,
                            metric,
                            severity = severity.as_str(),
                            alert_id = created.id,
                            actual_value = value,
                            "Alert created"
                        );
                    }
                    Err(e) => {
                        tracing::error!(engine_id, metric, error = %e, "Alert write failed");
                    }
                }
            }
        }
    }
}

/// Human-readable alert title for the known metrics.
fn alert_title(metric: &str, severity: AlertSeverity) -> String {
    let critical = severity == AlertSeverity::Critical;
    let title = match metric {
        m if m == METRIC_TEMP_EXHAUST && critical => "Critical Exhaust Temperature",
        m if m == METRIC_TEMP_EXHAUST => "High Exhaust Temperature",
        m if m == METRIC_VIBRATION && critical => "Critical Vibration Level",
        m if m == METRIC_VIBRATION => "High Vibration Level",
        other => return format!("{other} Alert"),
    };
    title.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_for_known_metrics() {
        assert_eq!(
            alert_title(METRIC_TEMP_EXHAUST, AlertSeverity::Critical),
            "Critical Exhaust Temperature"
        );
        assert_eq!(
            alert_title(METRIC_TEMP_EXHAUST, AlertSeverity::Warning),
            "High Exhaust Temperature"
        );
        assert_eq!(
            alert_title(METRIC_VIBRATION, AlertSeverity::Critical),
            "Critical Vibration Level"
        );
    }

    #[test]
    fn unknown_metric_gets_a_generic_title() {
        assert_eq!(
            alert_title("gas_pressure", AlertSeverity::Warning),
            "gas_pressure Alert"
        );
    }
}
