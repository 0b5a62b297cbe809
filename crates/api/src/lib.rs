//! Tollgate API server library.
//!
//! Exposes config, state, error handling, the login orchestrator and the
//! routes so integration tests and the binary entrypoint can both use them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
