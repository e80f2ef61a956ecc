//! Tiered cache: an always-available in-process tier with an optional
//! shared remote tier.
//!
//! Reads prefer the remote tier while it is healthy and fall back to the
//! in-process map; writes go to both. Remote-store failures are swallowed
//! and logged — cache availability is never allowed to block a caller —
//! and after a bounded number of consecutive failures the remote tier is
//! disabled for the remainder of the process.

mod remote;
mod store;
mod sweeper;

pub use remote::{RemoteStore, RemoteStoreError};
pub use store::TieredCache;
pub use sweeper::run_sweeper;
