//! Relational store contracts.
//!
//! Every repository method takes `&mut self` so the same trait can be served by
//! an autocommit connection or by an open transaction. A [`UnitOfWork`] bundles
//! all repositories behind one connection; [`TransactionCoordinator`] hands
//! those out.
//!
//! Dropping a transactional [`UnitOfWork`] without calling
//! [`UnitOfWork::commit`] discards everything written through it.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    NewSession, NewUser, NewUserProfile, NewUserProvider, Session, User, UserProfile, UserProvider,
};
use crate::types::DbId;

#[async_trait]
pub trait SessionStore: Send {
    /// Persist a session. The store assigns `id` and `created_at`.
    async fn create_session(&mut self, input: NewSession) -> Result<Session, StoreError>;

    /// Exact lookup. Does not filter on expiry or revocation.
    async fn find_session_by_refresh_token_hash(
        &mut self,
        hash: &str,
    ) -> Result<Session, StoreError>;

    /// Set `revoked_at = now` unless already set.
    ///
    /// Returns `true` when this call revoked the session and `false` when it
    /// was already revoked. Unknown ids yield [`StoreError::NotFound`].
    async fn revoke_session(&mut self, id: DbId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserRepository: Send {
    /// Insert a user. Email collisions yield [`StoreError::Conflict`].
    async fn create_user(&mut self, input: NewUser) -> Result<User, StoreError>;

    async fn get_user_by_email(&mut self, email: &str) -> Result<User, StoreError>;

    async fn get_user_by_id(&mut self, id: DbId) -> Result<User, StoreError>;

    async fn user_exists(&mut self, email: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserProviderRepository: Send {
    async fn find_provider(
        &mut self,
        provider: &str,
        provider_id: &str,
    ) -> Result<UserProvider, StoreError>;

    async fn create_provider(
        &mut self,
        user_id: DbId,
        input: NewUserProvider,
    ) -> Result<UserProvider, StoreError>;
}

#[async_trait]
pub trait UserProfileRepository: Send {
    async fn create_profile(
        &mut self,
        user_id: DbId,
        input: NewUserProfile,
    ) -> Result<UserProfile, StoreError>;
}

/// All repositories served over a single connection.
#[async_trait]
pub trait UnitOfWork:
    SessionStore + UserRepository + UserProviderRepository + UserProfileRepository
{
    /// Make every write performed through this unit durable. A no-op for
    /// autocommit units.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    /// Open a transaction. Writes become visible only after `commit`.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Borrow a connection where each call commits on its own.
    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
