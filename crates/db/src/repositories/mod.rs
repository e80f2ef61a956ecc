//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod alert_repo;
pub mod engine_repo;
pub mod event_repo;
pub mod telemetry_repo;
pub mod threshold_rule_repo;

pub use alert_repo::AlertRepo;
pub use engine_repo::EngineRepo;
pub use event_repo::EventRepo;
pub use telemetry_repo::TelemetryRepo;
pub use threshold_rule_repo::ThresholdRuleRepo;
