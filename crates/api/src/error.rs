use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tollgate_core::error::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`AuthError`] for session lifecycle failures and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure reported by the login orchestrator.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Missing or unusable access token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal(err: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Status, code and client-facing message for an orchestrator failure.
///
/// Rejections are reported verbatim; collaborator failures are logged and
/// rendered opaquely.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", message),
        AuthError::InvalidRefreshToken => {
            (StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN", message)
        }
        AuthError::InvalidState => (StatusCode::BAD_REQUEST, "INVALID_STATE", message),
        AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "EMAIL_ALREADY_EXISTS", message),
        AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        AuthError::UnknownProvider(_) => (StatusCode::NOT_FOUND, "UNKNOWN_PROVIDER", message),
        AuthError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
        AuthError::OAuth(detail) => {
            tracing::warn!(error = %detail, "OAuth provider failure");
            (
                StatusCode::BAD_GATEWAY,
                "OAUTH_ERROR",
                "Login provider failed".to_string(),
            )
        }
        AuthError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "CANCELLED", message),
        AuthError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED", message),
        AuthError::TokenGenerate(_)
        | AuthError::RevokeFailed(_)
        | AuthError::Store(_)
        | AuthError::Cache(_)
        | AuthError::Password(_) => internal(err),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(err) => classify_auth_error(err),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use tollgate_core::error::StoreError;

    use super::*;

    fn status_of(err: AuthError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn rejections_map_to_client_errors() {
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidRefreshToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidState), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::EmailAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AuthError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AuthError::UnknownProvider("github".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn collaborator_failures_are_opaque() {
        assert_eq!(
            status_of(AuthError::TokenGenerate("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AuthError::RevokeFailed(StoreError::backend("down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AuthError::OAuth("bad code".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn lifecycle_failures_map_to_timeouts() {
        assert_eq!(status_of(AuthError::Cancelled), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status_of(AuthError::DeadlineExceeded),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
