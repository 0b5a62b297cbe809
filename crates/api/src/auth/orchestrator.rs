//! Session lifecycle protocols: registration, password login, OAuth login,
//! refresh-token rotation and logout.
//!
//! Every public operation runs under the caller's [`RequestContext`]. When the
//! request is cancelled or its deadline passes, the in-flight future is
//! dropped and any open transaction rolls back with it.
//!
//! At-most-once refresh rests on [`SessionStore::revoke_session`] being a
//! single conditional update executed inside the rotation transaction before
//! anything is minted. The revocation blacklist is written after commit and
//! is best effort; the session table stays authoritative.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tollgate_cache::{OneTimeStateStore, RetryPolicy, RevocationBlacklist};
use tollgate_core::context::RequestContext;
use tollgate_core::email::normalize_email;
use tollgate_core::error::{AuthError, AuthResult, StoreError};
use tollgate_core::models::{NewSession, NewUser, NewUserProfile, NewUserProvider, Session, User};
use tollgate_core::oauth::{OAuthProfile, OAuthProvider};
use tollgate_core::password::PasswordEncrypter;
use tollgate_core::store::{
    SessionStore, TransactionCoordinator, UnitOfWork, UserProfileRepository,
    UserProviderRepository, UserRepository,
};
use tollgate_core::types::{DbId, PASSWORD_PROVIDER};

use crate::auth::jwt::{generate_refresh_token, hash_refresh_token, CredentialIssuer};

/// Credentials handed back after a successful login, registration or
/// rotation.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: DbId,
    pub user_id: DbId,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token (session) lifetime in seconds.
    pub refresh_expires_in: i64,
}

/// Input for [`LoginOrchestrator::register`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Tunables of the session lifecycle that are not token lifetimes.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Attach a first-time OAuth identity to an existing account with the
    /// same email. When off, such a login fails with
    /// [`AuthError::EmailAlreadyExists`].
    pub link_oauth_by_email: bool,
    /// Retry bound for blacklist writes after a revoke.
    pub blacklist_retry: RetryPolicy,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            link_oauth_by_email: true,
            blacklist_retry: RetryPolicy::default(),
        }
    }
}

pub struct LoginOrchestrator {
    store: Arc<dyn TransactionCoordinator>,
    issuer: CredentialIssuer,
    blacklist: RevocationBlacklist,
    states: OneTimeStateStore,
    passwords: Arc<dyn PasswordEncrypter>,
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
    policy: SessionPolicy,
    /// Verified against on login misses so that an unknown email costs as
    /// much as a wrong password.
    decoy_hash: Option<String>,
}

/// Plaintext behind the decoy hash. Never a valid login:
/// no provider row points at the resulting hash.
const DECOY_PASSWORD: &str = "tollgate-decoy-password";

impl LoginOrchestrator {
    pub fn new(
        store: Arc<dyn TransactionCoordinator>,
        issuer: CredentialIssuer,
        blacklist: RevocationBlacklist,
        states: OneTimeStateStore,
        passwords: Arc<dyn PasswordEncrypter>,
        policy: SessionPolicy,
    ) -> Self {
        let decoy_hash = match passwords.hash_password(DECOY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to prepare decoy password hash");
                None
            }
        };
        Self {
            store,
            issuer,
            blacklist,
            states,
            passwords,
            providers: HashMap::new(),
            policy,
            decoy_hash,
        }
    }

    /// Register an OAuth provider under its [`OAuthProvider::name`].
    pub fn with_provider(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn issuer(&self) -> &CredentialIssuer {
        &self.issuer
    }

    fn provider(&self, name: &str) -> AuthResult<Arc<dyn OAuthProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Create a password account and log it in.
    ///
    /// User, password provider, optional profile and the first session are
    /// written in one transaction.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        account: NewAccount,
    ) -> AuthResult<IssuedTokens> {
        ctx.run(self.register_inner(ctx, account)).await
    }

    async fn register_inner(
        &self,
        ctx: &RequestContext,
        account: NewAccount,
    ) -> AuthResult<IssuedTokens> {
        let email = normalize_email(&account.email);
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".into()));
        }
        if account.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }

        {
            let mut conn = self.store.connect().await?;
            if conn.user_exists(&email).await? {
                return Err(AuthError::EmailAlreadyExists);
            }
        }

        let password_hash = self
            .passwords
            .hash_password(&account.password)
            .map_err(|e| AuthError::Password(e.0))?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .create_user(NewUser {
                email: email.clone(),
            })
            .await
            .map_err(email_conflict)?;
        tx.create_provider(
            user.id,
            NewUserProvider {
                provider: PASSWORD_PROVIDER.to_string(),
                provider_id: email,
                password_hash: Some(password_hash),
            },
        )
        .await
        .map_err(email_conflict)?;

        if let Some(display_name) = non_empty(account.display_name.as_deref()) {
            tx.create_profile(
                user.id,
                NewUserProfile {
                    display_name,
                    avatar_url: None,
                },
            )
            .await?;
        }

        let (session, refresh_token) = self.open_session(tx.as_mut(), ctx, user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, session_id = session.id, "User registered");
        self.issue(&session, refresh_token)
    }

    // -----------------------------------------------------------------------
    // Password login
    // -----------------------------------------------------------------------

    /// Authenticate with email and password and open a new session.
    ///
    /// Unknown email, an account without a password and a wrong password are
    /// indistinguishable: all yield [`AuthError::InvalidCredentials`].
    pub async fn login_password(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> AuthResult<IssuedTokens> {
        ctx.run(self.login_password_inner(ctx, email, password))
            .await
    }

    async fn login_password_inner(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> AuthResult<IssuedTokens> {
        let email = normalize_email(email);

        let provider = {
            let mut conn = self.store.connect().await?;
            match conn.find_provider(PASSWORD_PROVIDER, &email).await {
                Ok(provider) => provider,
                Err(StoreError::NotFound) => {
                    self.check_decoy(password);
                    return Err(AuthError::InvalidCredentials);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let Some(hash) = provider.password_hash.as_deref() else {
            self.check_decoy(password);
            return Err(AuthError::InvalidCredentials);
        };
        let matches = self
            .passwords
            .check_password(hash, password)
            .map_err(|e| AuthError::Password(e.0))?;
        if !matches {
            tracing::debug!(user_id = provider.user_id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let mut tx = self.store.begin().await?;
        let (session, refresh_token) = self
            .open_session(tx.as_mut(), ctx, provider.user_id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            user_id = provider.user_id,
            session_id = session.id,
            "Password login succeeded"
        );
        self.issue(&session, refresh_token)
    }

    // -----------------------------------------------------------------------
    // OAuth login
    // -----------------------------------------------------------------------

    /// Start an OAuth login: store a one-time state and return the provider
    /// URL to redirect the browser to.
    pub async fn oauth_authorize(&self, ctx: &RequestContext, provider: &str) -> AuthResult<String> {
        let provider = self.provider(provider)?;
        let state = self.states.generate_state(ctx).await?;
        Ok(provider.auth_url(&state))
    }

    /// Finish an OAuth login from the provider callback.
    ///
    /// The state is validated before anything else and consumed only after
    /// the transaction has committed.
    pub async fn login_oauth(
        &self,
        ctx: &RequestContext,
        provider: &str,
        state: &str,
        code: &str,
    ) -> AuthResult<IssuedTokens> {
        ctx.run(self.login_oauth_inner(ctx, provider, state, code))
            .await
    }

    async fn login_oauth_inner(
        &self,
        ctx: &RequestContext,
        provider: &str,
        state: &str,
        code: &str,
    ) -> AuthResult<IssuedTokens> {
        let provider = self.provider(provider)?;
        self.states.validate_state(ctx, state).await?;

        let profile = provider
            .exchange_code(ctx, code)
            .await
            .map_err(|e| AuthError::OAuth(e.to_string()))?;
        let email = normalize_email(&profile.email);
        if email.is_empty() {
            return Err(AuthError::OAuth(format!(
                "{} returned a profile without email",
                provider.name()
            )));
        }

        // A concurrent first login for the same identity or email makes our
        // insert hit a unique constraint. The winner has committed by then,
        // so a fresh transaction finds its rows.
        let mut attempt = 1;
        let (session, refresh_token) = loop {
            match self
                .oauth_session(ctx, provider.name(), &profile, &email)
                .await
            {
                Err(AuthError::Store(StoreError::Conflict(constraint)))
                    if attempt < OAUTH_LOGIN_ATTEMPTS =>
                {
                    tracing::debug!(
                        provider = provider.name(),
                        constraint = %constraint,
                        "Concurrent first login for identity, retrying"
                    );
                    attempt += 1;
                }
                result => break result.map_err(oauth_conflict)?,
            }
        };

        if let Err(e) = self.states.delete_state(ctx, state).await {
            tracing::warn!(error = %e, "Failed to consume OAuth state after login");
        }

        tracing::info!(
            user_id = session.user_id,
            session_id = session.id,
            provider = provider.name(),
            "OAuth login succeeded"
        );
        self.issue(&session, refresh_token)
    }

    /// One OAuth login transaction: resolve or link the identity, then open a
    /// session. Nothing is written unless every step succeeds.
    async fn oauth_session(
        &self,
        ctx: &RequestContext,
        provider: &str,
        profile: &OAuthProfile,
        email: &str,
    ) -> AuthResult<(Session, String)> {
        let mut tx = self.store.begin().await?;
        let user_id = match tx.find_provider(provider, &profile.external_id).await {
            Ok(link) => link.user_id,
            Err(StoreError::NotFound) => {
                self.link_identity(tx.as_mut(), provider, profile, email)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };
        let opened = self.open_session(tx.as_mut(), ctx, user_id).await?;
        tx.commit().await?;
        Ok(opened)
    }

    /// First login with this external identity: find or create the user by
    /// email, then attach the provider and, when missing, a profile.
    async fn link_identity(
        &self,
        uow: &mut dyn UnitOfWork,
        provider: &str,
        profile: &OAuthProfile,
        email: &str,
    ) -> AuthResult<DbId> {
        let user: User = match uow.get_user_by_email(email).await {
            Ok(existing) if self.policy.link_oauth_by_email => existing,
            Ok(_) => return Err(AuthError::EmailAlreadyExists),
            Err(StoreError::NotFound) => {
                uow.create_user(NewUser {
                    email: email.to_string(),
                })
                .await?
            }
            Err(e) => return Err(e.into()),
        };

        uow.create_provider(
            user.id,
            NewUserProvider {
                provider: provider.to_string(),
                provider_id: profile.external_id.clone(),
                password_hash: None,
            },
        )
        .await?;

        if user.profile.is_none() {
            if let Some(display_name) = non_empty(Some(&profile.name)) {
                uow.create_profile(
                    user.id,
                    NewUserProfile {
                        display_name,
                        avatar_url: profile.avatar_url.clone(),
                    },
                )
                .await?;
            }
        }

        tracing::info!(user_id = user.id, provider, "Linked OAuth identity");
        Ok(user.id)
    }

    // -----------------------------------------------------------------------
    // Refresh rotation
    // -----------------------------------------------------------------------

    /// Exchange a refresh token for a new session. The presented token is
    /// revoked in the same transaction and can never be redeemed again.
    pub async fn refresh(&self, ctx: &RequestContext, refresh_token: &str) -> AuthResult<IssuedTokens> {
        ctx.run(self.refresh_inner(ctx, refresh_token)).await
    }

    async fn refresh_inner(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> AuthResult<IssuedTokens> {
        let hash = hash_refresh_token(refresh_token);
        let session = self.find_session(refresh_token, &hash).await?;
        if !session.is_active(Utc::now()) {
            return Err(AuthError::InvalidRefreshToken);
        }

        match self.blacklist.is_revoked(&hash).await {
            Ok(true) => return Err(AuthError::InvalidRefreshToken),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(session_id = session.id, error = %e, "Blacklist lookup failed, relying on session table");
            }
        }

        let mut tx = self.store.begin().await?;
        match tx.revoke_session(session.id).await {
            Ok(true) => {}
            // Another request revoked it first.
            Ok(false) | Err(StoreError::NotFound) => return Err(AuthError::InvalidRefreshToken),
            Err(e) => return Err(AuthError::RevokeFailed(e)),
        }
        match tx.get_user_by_id(session.user_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(AuthError::InvalidRefreshToken),
            Err(e) => return Err(e.into()),
        }
        let (next, next_token) = self.open_session(tx.as_mut(), ctx, session.user_id).await?;
        tx.commit().await?;

        self.blacklist_revoked(&session, &hash).await;

        tracing::info!(
            user_id = session.user_id,
            old_session_id = session.id,
            session_id = next.id,
            "Refresh token rotated"
        );
        self.issue(&next, next_token)
    }

    // -----------------------------------------------------------------------
    // Logout
    // -----------------------------------------------------------------------

    /// Revoke the session identified by `refresh_token`.
    ///
    /// Logging out an already revoked but unexpired session succeeds without
    /// touching it.
    pub async fn logout(&self, ctx: &RequestContext, refresh_token: &str) -> AuthResult<()> {
        ctx.run(self.logout_inner(refresh_token)).await
    }

    async fn logout_inner(&self, refresh_token: &str) -> AuthResult<()> {
        let hash = hash_refresh_token(refresh_token);
        let session = self.find_session(refresh_token, &hash).await?;
        if session.is_expired(Utc::now()) {
            return Err(AuthError::InvalidRefreshToken);
        }
        if session.revoked_at.is_some() {
            tracing::debug!(session_id = session.id, "Session already revoked");
            return Ok(());
        }

        let revoked = {
            let mut conn = self.store.connect().await?;
            conn.revoke_session(session.id)
                .await
                .map_err(AuthError::RevokeFailed)?
        };
        if revoked {
            self.blacklist_revoked(&session, &hash).await;
        }

        tracing::info!(
            user_id = session.user_id,
            session_id = session.id,
            "Session logged out"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Load the user an access token was minted for.
    pub async fn current_user(&self, ctx: &RequestContext, user_id: DbId) -> AuthResult<User> {
        ctx.run(async {
            let mut conn = self.store.connect().await?;
            Ok::<_, AuthError>(conn.get_user_by_id(user_id).await?)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn find_session(&self, refresh_token: &str, hash: &str) -> AuthResult<Session> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }
        let mut conn = self.store.connect().await?;
        match conn.find_session_by_refresh_token_hash(hash).await {
            Ok(session) => Ok(session),
            Err(StoreError::NotFound) => Err(AuthError::InvalidRefreshToken),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a session with a fresh refresh token. Returns the session and the
    /// plaintext token; only its hash is stored.
    async fn open_session(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &RequestContext,
        user_id: DbId,
    ) -> AuthResult<(Session, String)> {
        let refresh_token = generate_refresh_token();
        let session = uow
            .create_session(NewSession {
                user_id,
                refresh_token_hash: hash_refresh_token(&refresh_token),
                user_agent: ctx.user_agent.clone(),
                ip_address: ctx.ip_address.clone(),
                expires_at: Utc::now() + self.issuer.config().refresh_ttl(),
            })
            .await?;
        Ok((session, refresh_token))
    }

    /// Best-effort blacklist write for a session that was just revoked.
    async fn blacklist_revoked(&self, session: &Session, hash: &str) {
        let ttl = session.remaining(Utc::now());
        if let Err(e) = self
            .blacklist
            .revoke_with_retry(hash, ttl, self.policy.blacklist_retry)
            .await
        {
            tracing::error!(
                session_id = session.id,
                error = %e,
                "Failed to blacklist revoked refresh token"
            );
        }
    }

    /// Run one password verification whose result is discarded.
    fn check_decoy(&self, password: &str) {
        if let Some(hash) = &self.decoy_hash {
            let _ = self.passwords.check_password(hash, password);
        }
    }

    fn issue(&self, session: &Session, refresh_token: String) -> AuthResult<IssuedTokens> {
        let config = self.issuer.config();
        let access_ttl = config.access_ttl();
        let access_token =
            self.issuer
                .generate_access_token(session.user_id, session.id, access_ttl)?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            session_id: session.id,
            user_id: session.user_id,
            access_expires_in: access_ttl.num_seconds(),
            refresh_expires_in: config.refresh_ttl().num_seconds(),
        })
    }
}

/// A unique-email violation means someone registered the address first.
/// Attempts at the OAuth login transaction.
const OAUTH_LOGIN_ATTEMPTS: u32 = 2;

/// Constraint guarding one account per email.
const USERS_EMAIL_CONSTRAINT: &str = "uq_users_email";

/// Final classification of an OAuth login failure once retries are spent.
fn oauth_conflict(err: AuthError) -> AuthError {
    match err {
        AuthError::Store(StoreError::Conflict(constraint))
            if constraint == USERS_EMAIL_CONSTRAINT =>
        {
            AuthError::EmailAlreadyExists
        }
        other => other,
    }
}

fn email_conflict(err: StoreError) -> AuthError {
    match err {
        StoreError::Conflict(_) => AuthError::EmailAlreadyExists,
        other => other.into(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
