//! Message processing: validate, persist, evaluate, derive status.

use chrono::Utc;
use gridwatch_core::metric_names::MONITORED_METRICS;
use gridwatch_core::thresholds::{
    default_rules, evaluate_metric, CompareOp, MetricEval, ThresholdRule,
};
use gridwatch_core::EngineStatus;
use gridwatch_db::models::event::CreateEvent;
use gridwatch_db::models::telemetry::CreateTelemetrySample;
use gridwatch_db::repositories::{EngineRepo, EventRepo, TelemetryRepo, ThresholdRuleRepo};
use gridwatch_db::DbPool;

use crate::alerts::AlertLifecycleManager;
use crate::message::{
    validate_event, validate_telemetry, EventMessage, TelemetryMessage, ValidatedSample,
};

/// Processes inbound telemetry and event payloads.
///
/// One instance per process, driven sequentially by the bus loop so samples
/// from a single subscription are handled in arrival order.
pub struct TelemetryPipeline {
    pool: DbPool,
    alerts: AlertLifecycleManager,
}

impl TelemetryPipeline {
    pub fn new(pool: DbPool, cooldown_window: chrono::Duration) -> Self {
        let alerts = AlertLifecycleManager::new(pool.clone(), cooldown_window);
        Self { pool, alerts }
    }

    /// Handle one raw telemetry payload.
    ///
    /// Persist the sample append-only, evaluate each monitored metric in
    /// fixed order, run the alert lifecycle, then overwrite the engine
    /// status with the worst severity seen in this sample.
    pub async fn handle_telemetry(&self, payload: &[u8]) {
        let msg: TelemetryMessage = match serde_json::from_slice(payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed telemetry payload");
                return;
            }
        };

        let now = Utc::now();
        let sample = match validate_telemetry(msg, now) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping invalid telemetry payload");
                return;
            }
        };

        if let Err(e) = TelemetryRepo::insert(&self.pool, &to_create(&sample)).await {
            tracing::error!(engine_id = %sample.engine_id, error = %e, "Failed to persist telemetry sample");
            return;
        }

        let rules = self.load_rules().await;

        let mut status = EngineStatus::Ok;
        for metric in MONITORED_METRICS {
            let Some(rule) = rules.iter().find(|r| r.metric == *metric) else {
                continue;
            };
            let Some(value) = sample.metric_value(metric) else {
                continue;
            };

            let eval = evaluate_metric(value, rule);
            if let MetricEval::Breach { severity, .. } = eval {
                status = status.max(EngineStatus::from_severity(severity));
            }
            self.alerts
                .apply(&sample.engine_id, metric, value, eval, now)
                .await;
        }

        match EngineRepo::set_status(&self.pool, &sample.engine_id, status).await {
            Ok(0) => {
                tracing::debug!(engine_id = %sample.engine_id, "Status write for unregistered engine");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(engine_id = %sample.engine_id, error = %e, "Failed to update engine status");
            }
        }
    }

    /// Handle one raw event payload: validate presence, persist verbatim.
    pub async fn handle_event(&self, payload: &[u8]) {
        let msg: EventMessage = match serde_json::from_slice(payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed event payload");
                return;
            }
        };

        let event = match validate_event(msg, Utc::now()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping invalid event payload");
                return;
            }
        };

        let create = CreateEvent {
            time: event.time,
            level: event.level,
            message: event.message,
            engine_id: event.engine_id,
        };
        if let Err(e) = EventRepo::insert(&self.pool, &create).await {
            tracing::error!(error = %e, "Failed to persist event");
        }
    }

    /// Load enabled threshold rules, falling back to the compiled-in
    /// defaults when the table is empty or unreachable.
    async fn load_rules(&self) -> Vec<ThresholdRule> {
        match ThresholdRuleRepo::list_enabled(&self.pool).await {
            Ok(rows) if !rows.is_empty() => rows
                .into_iter()
                .filter_map(|row| {
                    let Some(op) = CompareOp::parse(&row.compare_op) else {
                        tracing::warn!(metric = %row.metric, compare_op = %row.compare_op, "Skipping rule with unknown compare op");
                        return None;
                    };
                    Some(ThresholdRule {
                        metric: row.metric,
                        op,
                        warning_value: row.warning_value,
                        critical_value: row.critical_value,
                    })
                })
                .collect(),
            Ok(_) => default_rules(),
            Err(e) => {
                tracing::warn!(error = %e, "Threshold rule query failed, using defaults");
                default_rules()
            }
        }
    }
}

fn to_create(sample: &ValidatedSample) -> CreateTelemetrySample {
    CreateTelemetrySample {
        engine_id: sample.engine_id.clone(),
        time: sample.time,
        power_kw: sample.power_kw,
        temp_exhaust: sample.temp_exhaust,
        gas_consumption: sample.gas_consumption,
        vibration: sample.vibration,
        gas_pressure: sample.gas_pressure,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use gridwatch_core::metric_names::METRIC_VIBRATION;

    use super::*;

    /// Status derivation mirrors the pipeline loop without the persistence
    /// side effects.
    fn derive_status(sample: &ValidatedSample, rules: &[ThresholdRule]) -> EngineStatus {
        let mut status = EngineStatus::Ok;
        for metric in MONITORED_METRICS {
            let Some(rule) = rules.iter().find(|r| r.metric == *metric) else {
                continue;
            };
            let Some(value) = sample.metric_value(metric) else {
                continue;
            };
            if let MetricEval::Breach { severity, .. } = evaluate_metric(value, rule) {
                status = status.max(EngineStatus::from_severity(severity));
            }
        }
        status
    }

    fn sample(temp: f64, vibration: f64) -> ValidatedSample {
        ValidatedSample {
            engine_id: "gpu-2".into(),
            time: Utc::now(),
            power_kw: 1100.0,
            temp_exhaust: temp,
            gas_consumption: 290.0,
            vibration,
            gas_pressure: 3.1,
        }
    }

    #[test]
    fn critical_breach_yields_error_status() {
        // temp_exhaust 547 against (warning 500, critical 530).
        assert_eq!(
            derive_status(&sample(547.0, 4.0), &default_rules()),
            EngineStatus::Error
        );
    }

    #[test]
    fn normal_sample_yields_ok_status() {
        assert_eq!(
            derive_status(&sample(480.0, 4.0), &default_rules()),
            EngineStatus::Ok
        );
    }

    #[test]
    fn status_is_the_worst_across_metrics() {
        // Warning temperature plus critical vibration: error wins, in
        // either evaluation order.
        assert_eq!(
            derive_status(&sample(510.0, 16.0), &default_rules()),
            EngineStatus::Error
        );

        let reversed: Vec<ThresholdRule> = default_rules().into_iter().rev().collect();
        assert_eq!(
            derive_status(&sample(510.0, 16.0), &reversed),
            EngineStatus::Error
        );
    }

    #[test]
    fn warning_on_one_metric_only_yields_warning() {
        assert_eq!(
            derive_status(&sample(480.0, 11.0), &default_rules()),
            EngineStatus::Warning
        );
    }

    #[test]
    fn metrics_without_rules_are_ignored() {
        let rules = vec![ThresholdRule {
            metric: METRIC_VIBRATION.into(),
            op: CompareOp::Above,
            warning_value: 10.0,
            critical_value: 15.0,
        }];
        // The extreme temperature has no rule, so only vibration counts.
        assert_eq!(derive_status(&sample(900.0, 4.0), &rules), EngineStatus::Ok);
    }
}
