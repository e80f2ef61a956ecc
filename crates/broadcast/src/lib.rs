//! Shared broadcast layer: one periodically refreshed dashboard snapshot
//! fanned out to every live observer.
//!
//! - [`snapshot`] — aggregate dashboard state and the queries/math that
//!   build it.
//! - [`source`] — the [`SnapshotSource`] trait and its cache-aside
//!   production implementation.
//! - [`coordinator`] — observer registry, on-demand refresh timer, and
//!   fan-out.

pub mod coordinator;
pub mod snapshot;
pub mod source;

pub use coordinator::{BroadcastCoordinator, Subscription};
pub use snapshot::DashboardSnapshot;
pub use source::{CachedSnapshotSource, SnapshotSource};
