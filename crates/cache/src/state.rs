//! One-time OAuth state nonces (CSRF protection for the redirect flow).
//!
//! Validation and consumption are separate steps: a handler validates before
//! its transaction and deletes only once the whole login has succeeded.

use std::sync::Arc;
use std::time::Duration;

use rand::distr::Alphanumeric;
use rand::Rng;
use tollgate_core::cache::CacheStore;
use tollgate_core::context::RequestContext;
use tollgate_core::error::AuthError;

const KEY_PREFIX: &str = "oauth_state:";

/// Default state lifetime: long enough to finish a consent screen.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Length of a generated state token in alphanumeric characters.
const STATE_LEN: usize = 32;

fn key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

#[derive(Clone)]
pub struct OneTimeStateStore {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl OneTimeStateStore {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Create and store a fresh nonce.
    pub async fn generate_state(&self, ctx: &RequestContext) -> Result<String, AuthError> {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();

        ctx.run(async {
            self.cache.set_with_ttl(&key(&token), "1", self.ttl).await?;
            Ok::<_, AuthError>(())
        })
        .await?;

        Ok(token)
    }

    /// [`AuthError::InvalidState`] if `token` is empty, unknown or expired.
    /// Does not consume the token.
    pub async fn validate_state(&self, ctx: &RequestContext, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidState);
        }
        let present = ctx
            .run(async { Ok::<_, AuthError>(self.cache.exists(&key(token)).await?) })
            .await?;
        if present {
            Ok(())
        } else {
            Err(AuthError::InvalidState)
        }
    }

    /// Consume `token`. Deleting an empty or unknown token is a no-op.
    pub async fn delete_state(&self, ctx: &RequestContext, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Ok(());
        }
        ctx.run(async {
            self.cache.delete(&key(token)).await?;
            Ok::<_, AuthError>(())
        })
        .await
    }
}
