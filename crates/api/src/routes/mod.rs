pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                        register (public)
/// /auth/login                           password login (public)
/// /auth/oauth/{provider}/authorize      start OAuth login (public)
/// /auth/oauth/{provider}/callback       finish OAuth login (public)
/// /auth/refresh                         rotate refresh token (cookie)
/// /auth/logout                          revoke session (cookie)
/// /auth/me                              current user (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}
