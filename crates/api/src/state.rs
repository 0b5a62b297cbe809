use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tollgate_core::cache::CacheStore;
use tollgate_core::store::TransactionCoordinator;

use crate::auth::orchestrator::LoginOrchestrator;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Session lifecycle protocols.
    pub auth: Arc<LoginOrchestrator>,
    /// Relational store, used directly only by the health probe.
    pub store: Arc<dyn TransactionCoordinator>,
    /// Cache store, used directly only by the health probe.
    pub cache: Arc<dyn CacheStore>,
    /// Cancelled when the server gives up draining in-flight requests. Every
    /// request context is a child of this token.
    pub shutdown: CancellationToken,
}
