//! Threshold rule administration endpoints.
//!
//! Rules authored here are read-only to the evaluator; the ingestion
//! pipeline picks them up on the next sample.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use gridwatch_core::error::CoreError;
use gridwatch_core::thresholds::CompareOp;
use gridwatch_db::models::threshold::{ThresholdRuleRow, UpsertThresholdRule};
use gridwatch_db::repositories::ThresholdRuleRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /thresholds — list all threshold rules.
async fn list_thresholds(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ThresholdRuleRow>>>> {
    let rules = ThresholdRuleRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// PUT /thresholds — upsert a rule keyed by metric name.
async fn upsert_threshold(
    State(state): State<AppState>,
    Json(input): Json<UpsertThresholdRule>,
) -> AppResult<Json<DataResponse<ThresholdRuleRow>>> {
    validate_rule(&input)?;
    let rule = ThresholdRuleRepo::upsert(&state.pool, &input).await?;
    Ok(Json(DataResponse { data: rule }))
}

/// Reject rules the evaluator could never fire sensibly.
fn validate_rule(input: &UpsertThresholdRule) -> Result<(), AppError> {
    if input.metric.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "metric is required".to_string(),
        )));
    }

    let op = CompareOp::parse(&input.compare_op).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "unknown compare_op '{}'",
            input.compare_op
        )))
    })?;

    let ordered = match op {
        CompareOp::Above => input.warning_value < input.critical_value,
        CompareOp::Below => input.warning_value > input.critical_value,
    };
    if !ordered {
        return Err(AppError::Core(CoreError::Validation(
            "warning threshold must be breached before the critical threshold".to_string(),
        )));
    }
    Ok(())
}

/// Mount threshold routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/thresholds", get(list_thresholds).put(upsert_threshold))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(op: &str, warning: f64, critical: f64) -> UpsertThresholdRule {
        UpsertThresholdRule {
            metric: "temp_exhaust".to_string(),
            compare_op: op.to_string(),
            warning_value: warning,
            critical_value: critical,
        }
    }

    #[test]
    fn accepts_ordered_above_rule() {
        assert!(validate_rule(&rule("above", 500.0, 530.0)).is_ok());
    }

    #[test]
    fn accepts_ordered_below_rule() {
        assert!(validate_rule(&rule("below", 2.0, 1.0)).is_ok());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        assert!(validate_rule(&rule("above", 530.0, 500.0)).is_err());
        assert!(validate_rule(&rule("below", 1.0, 2.0)).is_err());
    }

    #[test]
    fn rejects_unknown_compare_op() {
        assert!(validate_rule(&rule("near", 1.0, 2.0)).is_err());
    }

    #[test]
    fn rejects_blank_metric() {
        let mut input = rule("above", 1.0, 2.0);
        input.metric = "  ".to_string();
        assert!(validate_rule(&input).is_err());
    }
}
