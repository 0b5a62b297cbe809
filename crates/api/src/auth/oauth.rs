//! Google OAuth 2.0 authorization-code provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tollgate_core::context::RequestContext;
use tollgate_core::oauth::{OAuthError, OAuthProfile, OAuthProvider};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

/// Outbound request timeout for token and userinfo calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client registration for Google login.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl GoogleOAuthConfig {
    /// Load from the environment. Returns `None` unless all of
    /// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and `GOOGLE_REDIRECT_URL`
    /// are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            client_id: var("GOOGLE_CLIENT_ID")?,
            client_secret: var("GOOGLE_CLIENT_SECRET")?,
            redirect_url: var("GOOGLE_REDIRECT_URL")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

pub struct GoogleOAuthProvider {
    config: GoogleOAuthConfig,
    auth_base: Url,
    client: reqwest::Client,
}

impl GoogleOAuthProvider {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self, OAuthError> {
        let auth_base = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("response_type", "code"),
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_url.as_str()),
                ("scope", GOOGLE_SCOPES),
            ],
        )
        .map_err(|e| error(format!("invalid authorization URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            auth_base,
            client,
        })
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| error(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| error(format!("failed to parse token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| error(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| error(format!("failed to parse userinfo response: {e}")))
    }
}

fn error(message: String) -> OAuthError {
    OAuthError {
        provider: "google".into(),
        message,
    }
}

fn into_profile(info: UserInfo) -> Result<OAuthProfile, OAuthError> {
    if info.email_verified == Some(false) {
        return Err(error("email address is not verified".into()));
    }
    let email = info
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| error("profile has no email address".into()))?;

    Ok(OAuthProfile {
        external_id: info.sub,
        email,
        name: info.name.unwrap_or_default(),
        avatar_url: info.picture,
    })
}

#[async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn auth_url(&self, state: &str) -> String {
        let mut url = self.auth_base.clone();
        url.query_pairs_mut().append_pair("state", state);
        url.into()
    }

    async fn exchange_code(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        tracing::debug!(request_id = ?ctx.request_id, "Exchanging Google authorization code");
        let access_token = self.fetch_access_token(code).await?;
        let info = self.fetch_user_info(&access_token).await?;
        into_profile(info)
    }
}
