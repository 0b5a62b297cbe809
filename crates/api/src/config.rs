use std::time::Duration;

use tollgate_cache::RetryPolicy;

use crate::auth::jwt::JwtConfig;
use crate::auth::orchestrator::SessionPolicy;

/// Time left to the HTTP layer for writing the error response after an
/// orchestrator deadline fires.
pub const DEADLINE_HEADROOM: Duration = Duration::from_secs(1);

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Also bounds the
    /// deadline of every orchestrator call.
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Session lifecycle settings.
    pub auth: AuthConfig,
}

/// Settings of the login flows beyond token lifetimes.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of an OAuth state nonce in seconds (default: `600`).
    pub oauth_state_ttl_secs: u64,
    /// Attempts for a blacklist write after a revoke (default: `3`).
    pub blacklist_retry_attempts: u32,
    /// Base backoff between blacklist attempts in milliseconds (default: `50`).
    pub blacklist_retry_backoff_ms: u64,
    /// Link a first-time OAuth identity to an existing account with the same
    /// email (default: `true`).
    pub link_oauth_by_email: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oauth_state_ttl_secs: 600,
            blacklist_retry_attempts: 3,
            blacklist_retry_backoff_ms: 50,
            link_oauth_by_email: true,
        }
    }
}

impl AuthConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `OAUTH_STATE_TTL_SECS`       | `600`   |
    /// | `BLACKLIST_RETRY_ATTEMPTS`   | `3`     |
    /// | `BLACKLIST_RETRY_BACKOFF_MS` | `50`    |
    /// | `AUTH_LINK_OAUTH_BY_EMAIL`   | `true`  |
    pub fn from_env() -> Self {
        let oauth_state_ttl_secs: u64 = std::env::var("OAUTH_STATE_TTL_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("OAUTH_STATE_TTL_SECS must be a valid u64");

        let blacklist_retry_attempts: u32 = std::env::var("BLACKLIST_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("BLACKLIST_RETRY_ATTEMPTS must be a valid u32");

        let blacklist_retry_backoff_ms: u64 = std::env::var("BLACKLIST_RETRY_BACKOFF_MS")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("BLACKLIST_RETRY_BACKOFF_MS must be a valid u64");

        let link_oauth_by_email: bool = std::env::var("AUTH_LINK_OAUTH_BY_EMAIL")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("AUTH_LINK_OAUTH_BY_EMAIL must be `true` or `false`");

        Self {
            oauth_state_ttl_secs,
            blacklist_retry_attempts,
            blacklist_retry_backoff_ms,
            link_oauth_by_email,
        }
    }

    pub fn oauth_state_ttl(&self) -> Duration {
        Duration::from_secs(self.oauth_state_ttl_secs)
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            link_oauth_by_email: self.link_oauth_by_email,
            blacklist_retry: RetryPolicy {
                max_attempts: self.blacklist_retry_attempts,
                backoff: Duration::from_millis(self.blacklist_retry_backoff_ms),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// See [`JwtConfig::from_env`] and [`AuthConfig::from_env`] for the rest.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            auth: AuthConfig::from_env(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Deadline for the orchestrator call behind a request.
    ///
    /// Shorter than [`request_timeout`](Self::request_timeout) by
    /// [`DEADLINE_HEADROOM`], or half of it for very short timeouts, so an
    /// overrun surfaces as `DeadlineExceeded` (504) before the HTTP timeout
    /// layer answers 408.
    pub fn operation_deadline(&self) -> Duration {
        let timeout = self.request_timeout();
        if timeout > DEADLINE_HEADROOM * 2 {
            timeout - DEADLINE_HEADROOM
        } else {
            timeout / 2
        }
    }
}
