#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use tollgate_api::auth::jwt::{hash_refresh_token, CredentialIssuer, JwtConfig};
use tollgate_api::auth::orchestrator::{LoginOrchestrator, SessionPolicy};
use tollgate_api::config::{AuthConfig, ServerConfig};
use tollgate_api::router::build_app_router;
use tollgate_api::state::AppState;
use tollgate_cache::{MemoryCache, OneTimeStateStore, RetryPolicy, RevocationBlacklist};
use tollgate_core::cache::CacheStore;
use tollgate_core::context::RequestContext;
use tollgate_core::error::{CacheError, StoreError};
use tollgate_core::models::{
    NewSession, NewUser, NewUserProfile, NewUserProvider, Session, User, UserProfile,
    UserProvider,
};
use tollgate_core::oauth::{OAuthError, OAuthProfile, OAuthProvider};
use tollgate_core::password::{PasswordEncrypter, PasswordError};
use tollgate_core::store::{
    SessionStore, TransactionCoordinator, UnitOfWork, UserProfileRepository,
    UserProviderRepository, UserRepository,
};
use tollgate_core::types::{DbId, Timestamp};
use tollgate_db::memory::MemoryStore;

pub const FAKE_PROVIDER: &str = "fake";

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

/// OAuth provider that maps known codes to canned profiles.
#[derive(Default)]
pub struct FakeOAuthProvider {
    profiles: HashMap<String, OAuthProfile>,
    delay: Option<Duration>,
}

impl FakeOAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, code: &str, profile: OAuthProfile) -> Self {
        self.profiles.insert(code.to_string(), profile);
        self
    }

    /// Sleep this long before answering an exchange.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuthProvider {
    fn name(&self) -> &str {
        FAKE_PROVIDER
    }

    fn auth_url(&self, state: &str) -> String {
        format!("https://oauth.example.test/authorize?state={state}")
    }

    async fn exchange_code(
        &self,
        _ctx: &RequestContext,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.profiles.get(code).cloned().ok_or_else(|| OAuthError {
            provider: FAKE_PROVIDER.into(),
            message: "invalid authorization code".into(),
        })
    }
}

pub fn oauth_profile(external_id: &str, email: &str, name: &str) -> OAuthProfile {
    OAuthProfile {
        external_id: external_id.into(),
        email: email.into(),
        name: name.into(),
        avatar_url: Some(format!("https://img.example.test/{external_id}.png")),
    }
}

/// Reversible stand-in for Argon2 so tests stay fast.
pub struct PlainPasswords;

impl PasswordEncrypter for PlainPasswords {
    fn hash_password(&self, plain: &str) -> Result<String, PasswordError> {
        Ok(format!("plain${plain}"))
    }

    fn check_password(&self, hash: &str, plain: &str) -> Result<bool, PasswordError> {
        let stored = hash
            .strip_prefix("plain$")
            .ok_or_else(|| PasswordError("unrecognised hash".into()))?;
        Ok(stored == plain)
    }
}

/// [`PlainPasswords`] that counts verifications.
#[derive(Clone, Default)]
pub struct CountingPasswords {
    checks: Arc<AtomicUsize>,
}

impl CountingPasswords {
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl PasswordEncrypter for CountingPasswords {
    fn hash_password(&self, plain: &str) -> Result<String, PasswordError> {
        PlainPasswords.hash_password(plain)
    }

    fn check_password(&self, hash: &str, plain: &str) -> Result<bool, PasswordError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        PlainPasswords.check_password(hash, plain)
    }
}

/// Store whose first transactional provider lookup misses, as if another
/// request committed the same identity right after we looked.
pub struct StaleFirstLookup {
    inner: MemoryStore,
    stale: Arc<AtomicBool>,
}

impl StaleFirstLookup {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            stale: Arc::new(AtomicBool::new(true)),
        }
    }
}

#[async_trait]
impl TransactionCoordinator for StaleFirstLookup {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(StaleUnit {
            inner: self.inner.begin().await?,
            stale: Arc::clone(&self.stale),
        }))
    }

    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        self.inner.connect().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

struct StaleUnit {
    inner: Box<dyn UnitOfWork>,
    stale: Arc<AtomicBool>,
}

#[async_trait]
impl SessionStore for StaleUnit {
    async fn create_session(&mut self, input: NewSession) -> Result<Session, StoreError> {
        self.inner.create_session(input).await
    }

    async fn find_session_by_refresh_token_hash(
        &mut self,
        hash: &str,
    ) -> Result<Session, StoreError> {
        self.inner.find_session_by_refresh_token_hash(hash).await
    }

    async fn revoke_session(&mut self, id: DbId) -> Result<bool, StoreError> {
        self.inner.revoke_session(id).await
    }
}

#[async_trait]
impl UserRepository for StaleUnit {
    async fn create_user(&mut self, input: NewUser) -> Result<User, StoreError> {
        self.inner.create_user(input).await
    }

    async fn get_user_by_email(&mut self, email: &str) -> Result<User, StoreError> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_id(&mut self, id: DbId) -> Result<User, StoreError> {
        self.inner.get_user_by_id(id).await
    }

    async fn user_exists(&mut self, email: &str) -> Result<bool, StoreError> {
        self.inner.user_exists(email).await
    }
}

#[async_trait]
impl UserProviderRepository for StaleUnit {
    async fn find_provider(
        &mut self,
        provider: &str,
        provider_id: &str,
    ) -> Result<UserProvider, StoreError> {
        if self.stale.swap(false, Ordering::SeqCst) {
            return Err(StoreError::NotFound);
        }
        self.inner.find_provider(provider, provider_id).await
    }

    async fn create_provider(
        &mut self,
        user_id: DbId,
        input: NewUserProvider,
    ) -> Result<UserProvider, StoreError> {
        self.inner.create_provider(user_id, input).await
    }
}

#[async_trait]
impl UserProfileRepository for StaleUnit {
    async fn create_profile(
        &mut self,
        user_id: DbId,
        input: NewUserProfile,
    ) -> Result<UserProfile, StoreError> {
        self.inner.create_profile(user_id, input).await
    }
}

#[async_trait]
impl UnitOfWork for StaleUnit {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }
}

/// Cache where every call fails, for outage tests.
pub struct DownCache;

#[async_trait]
impl CacheStore for DownCache {
    async fn set_with_ttl(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn exists(&self, _: &str) -> Result<bool, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn delete(&self, _: &str) -> Result<bool, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }
}

// ---------------------------------------------------------------------------
// Configuration and wiring
// ---------------------------------------------------------------------------

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        access_token_expiry_mins: 15,
        refresh_token_expiry_days: 7,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: test_jwt_config(),
        auth: AuthConfig::default(),
    }
}

pub fn test_policy() -> SessionPolicy {
    SessionPolicy {
        link_oauth_by_email: true,
        blacklist_retry: RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        },
    }
}

/// Orchestrator over the given adapters with [`FakeOAuthProvider`] registered.
pub fn orchestrator(
    store: &MemoryStore,
    cache: Arc<dyn CacheStore>,
    provider: FakeOAuthProvider,
    policy: SessionPolicy,
) -> LoginOrchestrator {
    orchestrator_over(
        Arc::new(store.clone()),
        cache,
        Arc::new(PlainPasswords),
        provider,
        policy,
    )
}

pub fn orchestrator_over(
    store: Arc<dyn TransactionCoordinator>,
    cache: Arc<dyn CacheStore>,
    passwords: Arc<dyn PasswordEncrypter>,
    provider: FakeOAuthProvider,
    policy: SessionPolicy,
) -> LoginOrchestrator {
    LoginOrchestrator::new(
        store,
        CredentialIssuer::new(test_jwt_config()),
        RevocationBlacklist::new(Arc::clone(&cache)),
        OneTimeStateStore::new(cache, Duration::from_secs(600)),
        passwords,
        policy,
    )
    .with_provider(Arc::new(provider))
}

/// Everything a test needs to drive and inspect the service.
pub struct TestHarness {
    pub store: MemoryStore,
    pub cache: MemoryCache,
    pub auth: Arc<LoginOrchestrator>,
}

impl TestHarness {
    pub fn new(provider: FakeOAuthProvider) -> Self {
        Self::with_policy(provider, test_policy())
    }

    pub fn with_policy(provider: FakeOAuthProvider, policy: SessionPolicy) -> Self {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let auth = orchestrator(&store, Arc::new(cache.clone()), provider, policy);
        Self {
            store,
            cache,
            auth: Arc::new(auth),
        }
    }

    /// The full application router over this harness's adapters.
    pub fn app(&self) -> Router {
        self.app_with(test_config())
    }

    /// Like [`TestHarness::app`] with a caller-supplied server config.
    pub fn app_with(&self, config: ServerConfig) -> Router {
        let state = AppState {
            config: Arc::new(config.clone()),
            auth: Arc::clone(&self.auth),
            store: Arc::new(self.store.clone()),
            cache: Arc::new(self.cache.clone()),
            shutdown: CancellationToken::new(),
        };
        build_app_router(state, &config)
    }

    pub fn blacklist(&self) -> RevocationBlacklist {
        RevocationBlacklist::new(Arc::new(self.cache.clone()))
    }

    /// Insert a session directly, bypassing the orchestrator.
    pub async fn insert_session(
        &self,
        user_id: DbId,
        refresh_token: &str,
        expires_at: Timestamp,
    ) -> Session {
        let mut conn = self.store.connect().await.unwrap();
        conn.create_session(NewSession {
            user_id,
            refresh_token_hash: hash_refresh_token(refresh_token),
            user_agent: None,
            ip_address: None,
            expires_at,
        })
        .await
        .unwrap()
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(
        app,
        Request::builder()
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// POST with an empty body and the refresh-token cookie set.
pub async fn post_with_refresh_cookie(app: Router, uri: &str, refresh_token: &str) -> Response {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(COOKIE, format!("refresh_token={refresh_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Raw `Set-Cookie` header of a response, if any.
pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Refresh-token value from a response's `Set-Cookie` header.
pub fn refresh_token_of(response: &Response) -> Option<String> {
    let cookie = set_cookie(response)?;
    let first = cookie.split(';').next()?;
    let value = first.strip_prefix("refresh_token=")?;
    (!value.is_empty()).then(|| value.to_string())
}
