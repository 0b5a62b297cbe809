//! Handlers for the `/auth` resource.
//!
//! The refresh token never appears in a response body. It travels in an
//! `HttpOnly` cookie scoped to the auth routes and is read back from there by
//! `refresh` and `logout`.

use axum::extract::{Path, Query, State};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tollgate_core::error::AuthError;
use tollgate_core::models::User;
use tollgate_core::types::DbId;
use validator::Validate;

use crate::auth::orchestrator::{IssuedTokens, NewAccount};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::context::RequestCtx;
use crate::state::AppState;

/// Name of the refresh-token cookie.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
/// Path the refresh-token cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub display_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query string of the OAuth provider callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    #[serde(default)]
    pub state: String,
    pub code: Option<String>,
    /// Set by the provider when the user denied consent.
    pub error: Option<String>,
}

/// Body returned by every endpoint that opens a session.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub session_id: DbId,
    pub user_id: DbId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a password account and log it in. Returns 201.
pub async fn register(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Json(input): Json<RegisterRequest>,
) -> AppResult<Response> {
    input
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let tokens = state
        .auth
        .register(
            &ctx,
            NewAccount {
                email: input.email,
                password: input.password,
                display_name: input.display_name,
            },
        )
        .await?;

    session_response(StatusCode::CREATED, tokens)
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password.
pub async fn login(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Json(input): Json<LoginRequest>,
) -> AppResult<Response> {
    let tokens = state
        .auth
        .login_password(&ctx, &input.email, &input.password)
        .await?;
    session_response(StatusCode::OK, tokens)
}

/// GET /api/v1/auth/oauth/{provider}/authorize
///
/// Redirect (302) to the provider's consent screen.
pub async fn oauth_authorize(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Path(provider): Path<String>,
) -> AppResult<Response> {
    let url = state.auth.oauth_authorize(&ctx, &provider).await?;
    let location = HeaderValue::from_str(&url)
        .map_err(|e| AppError::InternalError(format!("Invalid redirect URL: {e}")))?;
    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}

/// GET /api/v1/auth/oauth/{provider}/callback?state=..&code=..
///
/// Finish an OAuth login.
pub async fn oauth_callback(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> AppResult<Response> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!(
            "Login with {provider} was not completed: {error}"
        )));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".into()))?;

    let tokens = state
        .auth
        .login_oauth(&ctx, &provider, &query.state, &code)
        .await?;
    session_response(StatusCode::OK, tokens)
}

/// POST /api/v1/auth/refresh
///
/// Rotate the refresh token from the cookie into a new session.
pub async fn refresh(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    headers: HeaderMap,
) -> AppResult<Response> {
    let token = refresh_token_from(&headers).ok_or(AuthError::InvalidRefreshToken)?;
    let tokens = state.auth.refresh(&ctx, &token).await?;
    session_response(StatusCode::OK, tokens)
}

/// POST /api/v1/auth/logout
///
/// Revoke the session from the cookie and clear it. Returns 204.
pub async fn logout(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    headers: HeaderMap,
) -> AppResult<Response> {
    let token = refresh_token_from(&headers).ok_or(AuthError::InvalidRefreshToken)?;
    state.auth.logout(&ctx, &token).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_refresh_cookie())],
    )
        .into_response())
}

/// GET /api/v1/auth/me
///
/// The user the access token was minted for, with profile.
pub async fn me(
    State(state): State<AppState>,
    RequestCtx(ctx): RequestCtx,
    caller: AuthUser,
) -> AppResult<Json<User>> {
    tracing::debug!(
        user_id = caller.user_id,
        session_id = caller.session_id,
        "Loading current user"
    );
    let user = state.auth.current_user(&ctx, caller.user_id).await?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn session_response(status: StatusCode, tokens: IssuedTokens) -> AppResult<Response> {
    let cookie = refresh_cookie(&tokens.refresh_token, tokens.refresh_expires_in)
        .map_err(|e| AppError::InternalError(format!("Invalid refresh cookie: {e}")))?;

    let body = TokenResponse {
        access_token: tokens.access_token,
        token_type: "Bearer",
        expires_in: tokens.access_expires_in,
        session_id: tokens.session_id,
        user_id: tokens.user_id,
    };
    Ok((status, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `Set-Cookie` value carrying the refresh token.
pub fn refresh_cookie(
    token: &str,
    max_age_secs: i64,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE_NAME}={token}; Path={REFRESH_COOKIE_PATH}; HttpOnly; Secure; SameSite=Strict; Max-Age={max_age_secs}"
    ))
}

/// `Set-Cookie` value that removes the refresh token.
pub fn clear_refresh_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "refresh_token=; Path=/api/v1/auth; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
    )
}

/// The refresh token from the `Cookie` header, if any.
pub fn refresh_token_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == REFRESH_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
