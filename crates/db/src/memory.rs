//! In-process implementation of the store traits for development and tests.
//!
//! A transaction takes the store lock for its whole lifetime and works on a
//! staged copy of the data, so transactions are serializable and a dropped
//! transaction leaves no trace. Autocommit units lock per call. A task must
//! not use an autocommit unit while it holds an open transaction on the same
//! store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tollgate_core::error::StoreError;
use tollgate_core::models::{
    NewSession, NewUser, NewUserProfile, NewUserProvider, Session, User, UserProfile, UserProvider,
};
use tollgate_core::store::{
    SessionStore, TransactionCoordinator, UnitOfWork, UserProfileRepository,
    UserProviderRepository, UserRepository,
};
use tollgate_core::types::{DbId, Timestamp};

#[derive(Debug, Clone)]
struct UserRecord {
    id: DbId,
    email: String,
    created_at: Timestamp,
    updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: DbId,
    users: BTreeMap<DbId, UserRecord>,
    providers: BTreeMap<DbId, UserProvider>,
    /// Keyed by user id: at most one profile per user.
    profiles: BTreeMap<DbId, UserProfile>,
    sessions: BTreeMap<DbId, Session>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn user(&self, record: &UserRecord) -> User {
        User {
            id: record.id,
            email: record.email.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            profile: self.profiles.get(&record.id).cloned(),
        }
    }

    fn find_user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    fn require_user(&self, user_id: DbId) -> Result<(), StoreError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::backend(format!(
                "foreign key violation: user {user_id} does not exist"
            )))
        }
    }

    fn create_user(&mut self, input: NewUser) -> Result<User, StoreError> {
        if self.find_user_by_email(&input.email).is_some() {
            return Err(StoreError::Conflict("uq_users_email".into()));
        }
        let record = UserRecord {
            id: self.next_id(),
            email: input.email,
            created_at: Utc::now(),
            updated_at: None,
        };
        let user = self.user(&record);
        self.users.insert(record.id, record);
        Ok(user)
    }

    fn create_provider(
        &mut self,
        user_id: DbId,
        input: NewUserProvider,
    ) -> Result<UserProvider, StoreError> {
        self.require_user(user_id)?;
        let taken = self
            .providers
            .values()
            .any(|p| p.provider == input.provider && p.provider_id == input.provider_id);
        if taken {
            return Err(StoreError::Conflict("uq_user_providers_provider".into()));
        }
        let provider = UserProvider {
            id: self.next_id(),
            user_id,
            provider: input.provider,
            provider_id: input.provider_id,
            password_hash: input.password_hash,
        };
        self.providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    fn create_profile(
        &mut self,
        user_id: DbId,
        input: NewUserProfile,
    ) -> Result<UserProfile, StoreError> {
        self.require_user(user_id)?;
        if self.profiles.contains_key(&user_id) {
            return Err(StoreError::Conflict("uq_user_profiles_user_id".into()));
        }
        let profile = UserProfile {
            id: self.next_id(),
            user_id,
            display_name: input.display_name,
            avatar_url: input.avatar_url,
            created_at: Utc::now(),
        };
        self.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    fn create_session(&mut self, input: NewSession) -> Result<Session, StoreError> {
        self.require_user(input.user_id)?;
        let taken = self
            .sessions
            .values()
            .any(|s| s.refresh_token_hash == input.refresh_token_hash);
        if taken {
            return Err(StoreError::Conflict(
                "uq_user_sessions_refresh_token_hash".into(),
            ));
        }
        let session = Session {
            id: self.next_id(),
            user_id: input.user_id,
            refresh_token_hash: input.refresh_token_hash,
            user_agent: input.user_agent,
            ip_address: input.ip_address,
            created_at: Utc::now(),
            expires_at: input.expires_at,
            revoked_at: None,
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn revoke_session(&mut self, id: DbId) -> Result<bool, StoreError> {
        let session = self.sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if session.revoked_at.is_some() {
            return Ok(false);
        }
        session.revoked_at = Some(Utc::now());
        Ok(true)
    }
}

/// Shared in-memory store. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

/// Injected backend failures, shared by every unit handed out.
#[derive(Debug, Default)]
struct Faults {
    revokes: AtomicBool,
    session_creates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `revoke_session` fail with a backend error.
    /// Used to exercise revoke-failure paths.
    pub fn fail_session_revokes(&self, fail: bool) {
        self.faults.revokes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `create_session` fail with a backend error.
    /// Writes made earlier in the same transaction must not survive.
    pub fn fail_session_creates(&self, fail: bool) {
        self.faults.session_creates.store(fail, Ordering::SeqCst);
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    pub async fn provider_count(&self) -> usize {
        self.state.lock().await.providers.len()
    }

    pub async fn profile_count(&self) -> usize {
        self.state.lock().await.profiles.len()
    }

    /// All sessions of `user_id`, oldest first.
    pub async fn sessions_for_user(&self, user_id: DbId) -> Vec<Session> {
        self.state
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn session(&self, id: DbId) -> Option<Session> {
        self.state.lock().await.sessions.get(&id).cloned()
    }

    fn unit(&self, scope: Scope) -> Box<dyn UnitOfWork> {
        Box::new(MemoryUnitOfWork {
            scope,
            faults: Arc::clone(&self.faults),
        })
    }
}

#[async_trait]
impl TransactionCoordinator for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(self.unit(Scope::Transaction { guard, staged }))
    }

    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(self.unit(Scope::Autocommit(Arc::clone(&self.state))))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

enum Scope {
    Autocommit(Arc<Mutex<MemoryState>>),
    Transaction {
        guard: OwnedMutexGuard<MemoryState>,
        staged: MemoryState,
    },
}

pub struct MemoryUnitOfWork {
    scope: Scope,
    faults: Arc<Faults>,
}

impl MemoryUnitOfWork {
    async fn with_state<R>(&mut self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        match &mut self.scope {
            Scope::Autocommit(state) => {
                let mut state = state.lock().await;
                f(&mut state)
            }
            Scope::Transaction { staged, .. } => f(staged),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryUnitOfWork {
    async fn create_session(&mut self, input: NewSession) -> Result<Session, StoreError> {
        if self.faults.session_creates.load(Ordering::SeqCst) {
            return Err(StoreError::backend("session insert unavailable"));
        }
        self.with_state(|s| s.create_session(input)).await
    }

    async fn find_session_by_refresh_token_hash(
        &mut self,
        hash: &str,
    ) -> Result<Session, StoreError> {
        self.with_state(|s| {
            s.sessions
                .values()
                .find(|session| session.refresh_token_hash == hash)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn revoke_session(&mut self, id: DbId) -> Result<bool, StoreError> {
        if self.faults.revokes.load(Ordering::SeqCst) {
            return Err(StoreError::backend("session revoke unavailable"));
        }
        self.with_state(|s| s.revoke_session(id)).await
    }
}

#[async_trait]
impl UserRepository for MemoryUnitOfWork {
    async fn create_user(&mut self, input: NewUser) -> Result<User, StoreError> {
        self.with_state(|s| s.create_user(input)).await
    }

    async fn get_user_by_email(&mut self, email: &str) -> Result<User, StoreError> {
        self.with_state(|s| {
            s.find_user_by_email(email)
                .map(|record| s.user(record))
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_user_by_id(&mut self, id: DbId) -> Result<User, StoreError> {
        self.with_state(|s| {
            s.users
                .get(&id)
                .map(|record| s.user(record))
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn user_exists(&mut self, email: &str) -> Result<bool, StoreError> {
        self.with_state(|s| Ok(s.find_user_by_email(email).is_some()))
            .await
    }
}

#[async_trait]
impl UserProviderRepository for MemoryUnitOfWork {
    async fn find_provider(
        &mut self,
        provider: &str,
        provider_id: &str,
    ) -> Result<UserProvider, StoreError> {
        self.with_state(|s| {
            s.providers
                .values()
                .find(|p| p.provider == provider && p.provider_id == provider_id)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn create_provider(
        &mut self,
        user_id: DbId,
        input: NewUserProvider,
    ) -> Result<UserProvider, StoreError> {
        self.with_state(|s| s.create_provider(user_id, input)).await
    }
}

#[async_trait]
impl UserProfileRepository for MemoryUnitOfWork {
    async fn create_profile(
        &mut self,
        user_id: DbId,
        input: NewUserProfile,
    ) -> Result<UserProfile, StoreError> {
        self.with_state(|s| s.create_profile(user_id, input)).await
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork { scope, .. } = *self;
        if let Scope::Transaction { mut guard, staged } = scope {
            *guard = staged;
        }
        Ok(())
    }
}
