//! Gridwatch API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! background jobs) so tests and the binary entrypoint can both access
//! them.

pub mod background;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;
