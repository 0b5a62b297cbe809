//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register                     -> register
/// POST /login                        -> login
/// GET  /oauth/{provider}/authorize   -> oauth_authorize
/// GET  /oauth/{provider}/callback    -> oauth_callback
/// POST /refresh                      -> refresh (refresh cookie)
/// POST /logout                       -> logout (refresh cookie)
/// GET  /me                           -> me (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/oauth/{provider}/authorize", get(auth::oauth_authorize))
        .route("/oauth/{provider}/callback", get(auth::oauth_callback))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}
