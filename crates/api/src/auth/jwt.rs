//! Access-token minting/validation and refresh-token helpers.
//!
//! Access tokens are HS256-signed JWTs carrying a [`Claims`] payload bound to
//! one session. Refresh tokens are opaque random strings; only their SHA-256
//! hash is stored server-side so a database leak does not expose live
//! sessions.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tollgate_core::error::AuthError;
use tollgate_core::types::DbId;
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Session the token was minted for.
    pub sid: DbId,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token (session) lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

/// Refresh token length. 48 alphanumeric characters carry more than 256 bits.
const REFRESH_TOKEN_LEN: usize = 48;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty, or if an expiry is not a
    /// positive integer.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");
        assert!(
            access_token_expiry_mins > 0,
            "JWT_ACCESS_EXPIRY_MINS must be positive"
        );

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");
        assert!(
            refresh_token_expiry_days > 0,
            "JWT_REFRESH_EXPIRY_DAYS must be positive"
        );

        Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

/// Mints and verifies credentials. Holds no per-request state.
#[derive(Clone)]
pub struct CredentialIssuer {
    config: JwtConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl CredentialIssuer {
    pub fn new(config: JwtConfig) -> Self {
        let encoding = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding,
            decoding,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Mint an HS256 access token for `user_id` bound to `session_id`, valid
    /// for `duration` from now.
    pub fn generate_access_token(
        &self,
        user_id: DbId,
        session_id: DbId,
        duration: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            sid: session_id,
            iat: now,
            exp: now + duration.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenGenerate(e.to_string()))
    }

    /// Verify signature, structure and expiry of an access token.
    pub fn parse_and_validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Fresh opaque refresh token from the thread-local CSPRNG.
pub fn generate_refresh_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of a refresh token. This is what gets persisted.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let issuer = CredentialIssuer::new(test_config());
        let token = issuer
            .generate_access_token(42, 7, Duration::minutes(15))
            .expect("token generation should succeed");

        let claims = issuer.parse_and_validate(&token).expect("token should validate");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.sid, 7);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_token_fails() {
        let issuer = CredentialIssuer::new(test_config());
        // Past the default 60s validation leeway.
        let token = issuer
            .generate_access_token(1, 1, Duration::seconds(-300))
            .unwrap();
        assert!(issuer.parse_and_validate(&token).is_err());
    }

    #[test]
    fn test_different_secrets_fail() {
        let issuer = CredentialIssuer::new(test_config());
        let token = issuer
            .generate_access_token(1, 1, Duration::minutes(5))
            .unwrap();

        let other = CredentialIssuer::new(JwtConfig {
            secret: "a-completely-different-secret-value".to_string(),
            ..test_config()
        });
        assert!(other.parse_and_validate(&token).is_err());
    }

    #[test]
    fn test_malformed_token_fails() {
        let issuer = CredentialIssuer::new(test_config());
        assert!(issuer.parse_and_validate("not.a.jwt").is_err());
        assert!(issuer.parse_and_validate("").is_err());
    }

    #[test]
    fn test_each_token_has_unique_jti() {
        let issuer = CredentialIssuer::new(test_config());
        let a = issuer.generate_access_token(1, 1, Duration::minutes(5)).unwrap();
        let b = issuer.generate_access_token(1, 1, Duration::minutes(5)).unwrap();
        let a = issuer.parse_and_validate(&a).unwrap();
        let b = issuer.parse_and_validate(&b).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_refresh_tokens_are_random() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_eq!(a.len(), REFRESH_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_token_hash_matches() {
        let token = generate_refresh_token();
        let hash = hash_refresh_token(&token);
        assert_eq!(hash, hash_refresh_token(&token));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(hash, hash_refresh_token("something-else"));
    }
}
