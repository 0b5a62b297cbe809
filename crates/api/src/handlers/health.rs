use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` when every dependency answers, `"degraded"` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the relational store is reachable.
    pub db_healthy: bool,
    /// Whether the cache store is reachable.
    pub cache_healthy: bool,
}

/// GET /health -- service, database and cache health.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db, cache) = tokio::join!(state.store.ping(), state.cache.ping());

    if let Err(e) = &db {
        tracing::warn!(error = %e, "Database health probe failed");
    }
    if let Err(e) = &cache {
        tracing::warn!(error = %e, "Cache health probe failed");
    }

    let db_healthy = db.is_ok();
    let cache_healthy = cache.is_ok();
    let status = if db_healthy && cache_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        cache_healthy,
    })
}
