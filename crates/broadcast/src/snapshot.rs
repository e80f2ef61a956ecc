//! Aggregate dashboard state and the queries/math that build it.

use chrono::Utc;
use gridwatch_core::types::Timestamp;
use gridwatch_core::EngineStatus;
use gridwatch_db::models::engine::Engine;
use gridwatch_db::models::event::EngineEvent;
use gridwatch_db::models::telemetry::LatestTelemetry;
use gridwatch_db::repositories::{EngineRepo, EventRepo, TelemetryRepo};
use gridwatch_db::DbPool;
use serde::{Deserialize, Serialize};

/// Electricity tariff, roubles per kWh.
pub const TARIFF_RUB_PER_KWH: f64 = 5.0;

/// Gas cost, roubles per cubic metre.
pub const GAS_COST_RUB_PER_M3: f64 = 6.5;

/// Planned output per engine, megawatts.
pub const PLANNED_MW_PER_ENGINE: f64 = 1.2;

/// Estimated loss per megawatt of shortfall against plan.
const DOWNTIME_LOSS_RUB_PER_MW: f64 = 5000.0;

/// Flat loss charged per engine running below the efficiency cutoff.
const INEFFICIENCY_LOSS_RUB: f64 = 500.0;

/// Engines below this efficiency contribute to the inefficiency loss.
const LOW_EFFICIENCY_CUTOFF: f64 = 40.0;

/// How many recent events ride along in the snapshot.
const RECENT_EVENTS_LIMIT: i64 = 10;

/// An engine joined with its latest telemetry and derived economics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineWithMetrics {
    pub id: String,
    pub model: String,
    pub status: String,
    pub total_hours: i64,
    pub power_kw: f64,
    pub temp_exhaust: f64,
    pub gas_consumption: f64,
    pub vibration: f64,
    pub gas_pressure: f64,
    pub profit_rate: f64,
    pub efficiency: f64,
}

/// Fleet-level summary derived from the per-engine metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_power_mw: f64,
    pub total_planned_mw: f64,
    pub efficiency: f64,
    pub current_loss: f64,
    pub engines_online: usize,
    pub engines_warning: usize,
    pub engines_error: usize,
    pub engines_total: usize,
}

/// The aggregate dashboard state pushed to all live observers.
///
/// Exactly one logical instance exists at a time; it is replaced wholesale
/// on each refresh and immutable after construction (shared as
/// `Arc<DashboardSnapshot>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub engines: Vec<EngineWithMetrics>,
    pub events: Vec<EngineEvent>,
    pub summary: DashboardSummary,
    pub generated_at: Timestamp,
}

/// Profit rate in roubles per hour: revenue from power minus gas cost.
pub fn profit_rate(power_kw: f64, gas_consumption: f64) -> f64 {
    power_kw * TARIFF_RUB_PER_KWH - gas_consumption * GAS_COST_RUB_PER_M3
}

/// Normalized efficiency percentage from the power/gas ratio, clamped to 100.
pub fn engine_efficiency(power_kw: f64, gas_consumption: f64) -> f64 {
    if gas_consumption <= 0.0 {
        return 0.0;
    }
    (power_kw / (gas_consumption * 4.0) * 100.0).min(100.0)
}

/// Join an engine with its latest telemetry, deriving the dashboard metrics.
///
/// Engines without any telemetry yet report zeros.
pub fn with_metrics(engine: &Engine, latest: Option<&LatestTelemetry>) -> EngineWithMetrics {
    let (power_kw, temp_exhaust, gas_consumption, vibration, gas_pressure) = match latest {
        Some(t) => (
            t.power_kw,
            t.temp_exhaust,
            t.gas_consumption,
            t.vibration,
            t.gas_pressure,
        ),
        None => (0.0, 0.0, 0.0, 0.0, 0.0),
    };

    EngineWithMetrics {
        id: engine.id.clone(),
        model: engine.model.clone(),
        status: engine.status.clone(),
        total_hours: engine.total_hours,
        power_kw,
        temp_exhaust,
        gas_consumption,
        vibration,
        gas_pressure,
        profit_rate: profit_rate(power_kw, gas_consumption),
        efficiency: engine_efficiency(power_kw, gas_consumption),
    }
}

/// Compute the fleet summary from per-engine metrics.
pub fn summarize(engines: &[EngineWithMetrics]) -> DashboardSummary {
    let total_power_mw: f64 = engines.iter().map(|e| e.power_kw / 1000.0).sum();
    let total_planned_mw = engines.len() as f64 * PLANNED_MW_PER_ENGINE;

    let efficiency = if total_planned_mw > 0.0 {
        total_power_mw / total_planned_mw * 100.0
    } else {
        0.0
    };

    let downtime_loss = (total_planned_mw - total_power_mw).max(0.0) * DOWNTIME_LOSS_RUB_PER_MW;
    let inefficiency_loss = engines
        .iter()
        .filter(|e| e.efficiency < LOW_EFFICIENCY_CUTOFF)
        .count() as f64
        * INEFFICIENCY_LOSS_RUB;

    DashboardSummary {
        total_power_mw,
        total_planned_mw,
        efficiency,
        current_loss: downtime_loss + inefficiency_loss,
        engines_online: count_status(engines, EngineStatus::Ok),
        engines_warning: count_status(engines, EngineStatus::Warning),
        engines_error: count_status(engines, EngineStatus::Error),
        engines_total: engines.len(),
    }
}

fn count_status(engines: &[EngineWithMetrics], status: EngineStatus) -> usize {
    engines
        .iter()
        .filter(|e| e.status == status.as_str())
        .count()
}

/// Build a fresh snapshot from the durable store.
///
/// The three aggregate queries run concurrently; this is the single
/// backing-store fetch guarded by the broadcast coordinator.
pub async fn build_snapshot(pool: &DbPool) -> Result<DashboardSnapshot, sqlx::Error> {
    let (engines, latest, events) = tokio::try_join!(
        EngineRepo::list_all(pool),
        TelemetryRepo::latest_per_engine(pool),
        EventRepo::list_recent(pool, RECENT_EVENTS_LIMIT),
    )?;

    let engines: Vec<EngineWithMetrics> = engines
        .iter()
        .map(|engine| {
            let telemetry = latest.iter().find(|t| t.engine_id == engine.id);
            with_metrics(engine, telemetry)
        })
        .collect();

    let summary = summarize(&engines);

    Ok(DashboardSnapshot {
        engines,
        events,
        summary,
        generated_at: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(status: &str, power_kw: f64, gas: f64) -> EngineWithMetrics {
        EngineWithMetrics {
            id: "gpu-1".into(),
            model: "Weichai 16VCN".into(),
            status: status.into(),
            total_hours: 8500,
            power_kw,
            temp_exhaust: 450.0,
            gas_consumption: gas,
            vibration: 4.0,
            gas_pressure: 3.2,
            profit_rate: profit_rate(power_kw, gas),
            efficiency: engine_efficiency(power_kw, gas),
        }
    }

    #[test]
    fn profit_rate_is_revenue_minus_gas_cost() {
        assert_eq!(profit_rate(1000.0, 200.0), 1000.0 * 5.0 - 200.0 * 6.5);
    }

    #[test]
    fn efficiency_clamps_at_100() {
        assert_eq!(engine_efficiency(10_000.0, 1.0), 100.0);
    }

    #[test]
    fn efficiency_is_zero_without_gas_flow() {
        assert_eq!(engine_efficiency(1000.0, 0.0), 0.0);
        assert_eq!(engine_efficiency(1000.0, -1.0), 0.0);
    }

    #[test]
    fn summary_counts_engines_by_status() {
        let engines = vec![
            metrics("ok", 1100.0, 300.0),
            metrics("ok", 1150.0, 310.0),
            metrics("warning", 900.0, 280.0),
            metrics("error", 0.0, 0.0),
        ];
        let summary = summarize(&engines);

        assert_eq!(summary.engines_total, 4);
        assert_eq!(summary.engines_online, 2);
        assert_eq!(summary.engines_warning, 1);
        assert_eq!(summary.engines_error, 1);
    }

    #[test]
    fn summary_charges_for_shortfall_and_inefficiency() {
        // One engine at full plan, one down: 1.2 MW shortfall plus the
        // inefficiency penalty for the idle engine.
        let engines = vec![metrics("ok", 1200.0, 300.0), metrics("error", 0.0, 0.0)];
        let summary = summarize(&engines);

        assert_eq!(summary.total_planned_mw, 2.4);
        assert!((summary.total_power_mw - 1.2).abs() < 1e-9);
        assert!((summary.current_loss - (1.2 * 5000.0 + 500.0)).abs() < 1e-6);
    }

    #[test]
    fn summary_of_empty_fleet_is_all_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.efficiency, 0.0);
        assert_eq!(summary.current_loss, 0.0);
        assert_eq!(summary.engines_total, 0);
    }

    #[test]
    fn engine_without_telemetry_reports_zeros() {
        let engine = Engine {
            id: "gpu-6".into(),
            model: "Jenbacher J620".into(),
            status: "ok".into(),
            total_hours: 100,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let derived = with_metrics(&engine, None);

        assert_eq!(derived.power_kw, 0.0);
        assert_eq!(derived.profit_rate, 0.0);
        assert_eq!(derived.efficiency, 0.0);
    }
}
