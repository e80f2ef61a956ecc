//! Threshold evaluation engine for engine telemetry.
//!
//! Pure logic — no database access. The caller is responsible for fetching
//! threshold rules and passing them in together with the sample values.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::alert::AlertSeverity;
use crate::metric_names::{METRIC_TEMP_EXHAUST, METRIC_VIBRATION};

/// Minimum interval between repeated alerts for the same engine + metric +
/// severity.
pub const DEFAULT_ALERT_COOLDOWN_SECS: i64 = 60;

/// Size bound past which the cooldown table is pruned opportunistically.
const MAX_COOLDOWN_ENTRIES: usize = 100;

/// Which side of the threshold counts as a breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Values strictly above the threshold breach it (temperatures, vibration).
    Above,
    /// Values strictly below the threshold breach it (pressures).
    Below,
}

impl CompareOp {
    fn breaches(self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::Above => value > threshold,
            CompareOp::Below => value < threshold,
        }
    }

    /// Parse the stable string form stored in `threshold_rules.compare_op`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "above" => Some(CompareOp::Above),
            "below" => Some(CompareOp::Below),
            _ => None,
        }
    }
}

/// A threshold rule used by the evaluator.
///
/// Read-only to the core: rules are authored externally and loaded from the
/// `threshold_rules` table (or taken from [`default_rules`]).
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    pub metric: String,
    pub op: CompareOp,
    pub warning_value: f64,
    pub critical_value: f64,
}

/// Outcome of evaluating one metric value against its rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricEval {
    /// Value is within the normal range; any active alert should resolve.
    Normal,
    /// Value breached a threshold.
    Breach {
        severity: AlertSeverity,
        threshold_value: f64,
    },
}

/// Evaluate a single metric value against its rule.
///
/// The critical threshold wins when both are breached.
pub fn evaluate_metric(value: f64, rule: &ThresholdRule) -> MetricEval {
    if rule.op.breaches(value, rule.critical_value) {
        MetricEval::Breach {
            severity: AlertSeverity::Critical,
            threshold_value: rule.critical_value,
        }
    } else if rule.op.breaches(value, rule.warning_value) {
        MetricEval::Breach {
            severity: AlertSeverity::Warning,
            threshold_value: rule.warning_value,
        }
    } else {
        MetricEval::Normal
    }
}

/// Compiled-in rules used when the `threshold_rules` table yields nothing.
pub fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            metric: METRIC_TEMP_EXHAUST.to_string(),
            op: CompareOp::Above,
            warning_value: 500.0,
            critical_value: 530.0,
        },
        ThresholdRule {
            metric: METRIC_VIBRATION.to_string(),
            op: CompareOp::Above,
            warning_value: 10.0,
            critical_value: 15.0,
        },
    ]
}

/// Build the cooldown key for an (engine, metric, severity) combination.
///
/// The severity is part of the key so a warning and a critical alert on the
/// same metric never suppress each other.
pub fn cooldown_key(engine_id: &str, metric: &str, severity: AlertSeverity) -> String {
    format!("{engine_id}:{metric}:{}", severity.as_str())
}

/// Tracks when the last alert fired per cooldown key to suppress repeated
/// alerts within the cooldown window.
///
/// Process-local and ephemeral; entries are pruned opportunistically once the
/// table grows past a size bound, dropping anything older than twice the
/// cooldown. That is an approximate cleanup, not an LRU.
#[derive(Debug)]
pub struct CooldownTracker {
    last_fired: HashMap<String, DateTime<Utc>>,
    cooldown: Duration,
    max_entries: usize,
}

impl CooldownTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_fired: HashMap::new(),
            cooldown,
            max_entries: MAX_COOLDOWN_ENTRIES,
        }
    }

    /// Check whether an alert for `key` may fire at `now`, recording the
    /// timestamp if so.
    ///
    /// Returns `false` while `now - last_fired < cooldown`.
    pub fn should_fire(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_fired.get(key) {
            if now.signed_duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_fired.insert(key.to_string(), now);
        if self.last_fired.len() > self.max_entries {
            self.prune(now);
        }
        true
    }

    /// Drop entries older than twice the cooldown window.
    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = self.cooldown * 2;
        self.last_fired
            .retain(|_, fired| now.signed_duration_since(*fired) <= cutoff);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.last_fired.len()
    }

    #[cfg(test)]
    fn with_max_entries(cooldown: Duration, max_entries: usize) -> Self {
        Self {
            last_fired: HashMap::new(),
            cooldown,
            max_entries,
        }
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_ALERT_COOLDOWN_SECS))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
