//! OAuth provider contract. The wire protocol lives in the implementation;
//! the session lifecycle only needs a code-for-profile exchange.

use async_trait::async_trait;

use crate::context::RequestContext;

/// User profile returned by a provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    /// The provider's stable subject id for this user.
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Failure reported by an OAuth provider.
#[derive(Debug, thiserror::Error)]
#[error("{provider}: {message}")]
pub struct OAuthError {
    pub provider: String,
    pub message: String,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name stored in `user_providers.provider` (e.g. `"google"`).
    fn name(&self) -> &str;

    /// Authorization URL the browser is redirected to, carrying `state`.
    fn auth_url(&self, state: &str) -> String;

    async fn exchange_code(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError>;
}
