//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, Postgres, Transaction};
use tollgate_core::error::StoreError;
use tollgate_core::models::{
    NewSession, NewUser, NewUserProfile, NewUserProvider, Session, User, UserProfile, UserProvider,
};
use tollgate_core::store::{
    SessionStore, TransactionCoordinator, UnitOfWork, UserProfileRepository,
    UserProviderRepository, UserRepository,
};
use tollgate_core::types::DbId;

use crate::repositories::{SessionRepo, UserProfileRepo, UserProviderRepo, UserRepo};
use crate::{store_error, DbPool};

/// Hands out pooled connections and transactions.
#[derive(Clone)]
pub struct PgCoordinator {
    pool: DbPool,
}

impl PgCoordinator {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionCoordinator for PgCoordinator {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgUnitOfWork {
            scope: Scope::Transaction(tx),
        }))
    }

    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let conn = self.pool.acquire().await.map_err(store_error)?;
        Ok(Box::new(PgUnitOfWork {
            scope: Scope::Autocommit(conn),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }
}

enum Scope {
    Autocommit(PoolConnection<Postgres>),
    /// Rolled back by sqlx when dropped without commit.
    Transaction(Transaction<'static, Postgres>),
}

/// All repositories over one pooled connection or one transaction.
pub struct PgUnitOfWork {
    scope: Scope,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> &mut PgConnection {
        match &mut self.scope {
            Scope::Autocommit(conn) => &mut **conn,
            Scope::Transaction(tx) => &mut **tx,
        }
    }
}

#[async_trait]
impl SessionStore for PgUnitOfWork {
    async fn create_session(&mut self, input: NewSession) -> Result<Session, StoreError> {
        SessionRepo::create(self.conn(), &input)
            .await
            .map(Session::from)
            .map_err(store_error)
    }

    async fn find_session_by_refresh_token_hash(
        &mut self,
        hash: &str,
    ) -> Result<Session, StoreError> {
        SessionRepo::find_by_refresh_token_hash(self.conn(), hash)
            .await
            .map_err(store_error)?
            .map(Session::from)
            .ok_or(StoreError::NotFound)
    }

    async fn revoke_session(&mut self, id: DbId) -> Result<bool, StoreError> {
        let revoked = SessionRepo::revoke(self.conn(), id)
            .await
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)?;
        if !revoked {
            tracing::debug!(session_id = id, "Session was already revoked");
        }
        Ok(revoked)
    }
}

#[async_trait]
impl UserRepository for PgUnitOfWork {
    async fn create_user(&mut self, input: NewUser) -> Result<User, StoreError> {
        UserRepo::create(self.conn(), &input)
            .await
            .map(User::from)
            .map_err(store_error)
    }

    async fn get_user_by_email(&mut self, email: &str) -> Result<User, StoreError> {
        UserRepo::find_by_email(self.conn(), email)
            .await
            .map_err(store_error)?
            .map(User::from)
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_id(&mut self, id: DbId) -> Result<User, StoreError> {
        UserRepo::find_by_id(self.conn(), id)
            .await
            .map_err(store_error)?
            .map(User::from)
            .ok_or(StoreError::NotFound)
    }

    async fn user_exists(&mut self, email: &str) -> Result<bool, StoreError> {
        UserRepo::exists(self.conn(), email)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl UserProviderRepository for PgUnitOfWork {
    async fn find_provider(
        &mut self,
        provider: &str,
        provider_id: &str,
    ) -> Result<UserProvider, StoreError> {
        UserProviderRepo::find(self.conn(), provider, provider_id)
            .await
            .map_err(store_error)?
            .map(UserProvider::from)
            .ok_or(StoreError::NotFound)
    }

    async fn create_provider(
        &mut self,
        user_id: DbId,
        input: NewUserProvider,
    ) -> Result<UserProvider, StoreError> {
        UserProviderRepo::create(self.conn(), user_id, &input)
            .await
            .map(UserProvider::from)
            .map_err(store_error)
    }
}

#[async_trait]
impl UserProfileRepository for PgUnitOfWork {
    async fn create_profile(
        &mut self,
        user_id: DbId,
        input: NewUserProfile,
    ) -> Result<UserProfile, StoreError> {
        UserProfileRepo::create(self.conn(), user_id, &input)
            .await
            .map(UserProfile::from)
            .map_err(store_error)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgUnitOfWork { scope } = *self;
        match scope {
            Scope::Autocommit(_) => Ok(()),
            Scope::Transaction(tx) => tx.commit().await.map_err(store_error),
        }
    }
}
