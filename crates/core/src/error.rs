//! Error taxonomy shared by every layer of the session lifecycle.
//!
//! [`AuthError`] is what the orchestrator returns. The input-rejected kinds
//! carry no detail so they can be reported to a caller verbatim; collaborator
//! failures keep their source for logging and are rendered opaquely at the edge.

/// Boxed error source carried by backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure from the relational store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    /// A unique constraint rejected the write. Holds the constraint name.
    #[error("Conflict on constraint {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }
}

/// Failure from the cache store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[source] BoxError),
}

impl CacheError {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // --- Input rejected ---
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("An account with this email already exists")]
    EmailAlreadyExists,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown login provider: {0}")]
    UnknownProvider(String),

    /// Internal lookup miss. Normalized before it reaches a caller.
    #[error("Not found")]
    NotFound,

    // --- Generation / revoke failures ---
    #[error("Failed to generate token: {0}")]
    TokenGenerate(String),

    #[error("Failed to revoke session")]
    RevokeFailed(#[source] StoreError),

    // --- Collaborators ---
    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("OAuth provider error: {0}")]
    OAuth(String),

    #[error("Password hashing error: {0}")]
    Password(String),

    // --- Request lifecycle ---
    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            other => AuthError::Store(other),
        }
    }
}

impl AuthError {
    /// True for failures caused by what the caller sent rather than by the
    /// service. These are stable and safe to show without detail.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidRefreshToken
                | AuthError::InvalidState
                | AuthError::EmailAlreadyExists
                | AuthError::Validation(_)
                | AuthError::UnknownProvider(_)
        )
    }
}

/// Convenience alias for orchestrator results.
pub type AuthResult<T> = Result<T, AuthError>;
