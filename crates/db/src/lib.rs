//! PostgreSQL persistence for users, login providers, profiles and sessions.
//!
//! [`PgCoordinator`] serves the `tollgate_core::store` traits over a
//! [`DbPool`]; [`memory::MemoryStore`] serves them from process memory.

use sqlx::postgres::PgPoolOptions;
use tollgate_core::error::StoreError;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod unit_of_work;

pub use unit_of_work::{PgCoordinator, PgUnitOfWork};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Classify a sqlx error into the store taxonomy.
///
/// - `RowNotFound` maps to [`StoreError::NotFound`].
/// - Unique violations (SQLSTATE 23505) map to [`StoreError::Conflict`] with
///   the constraint name.
/// - Everything else is kept as the backend source.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Conflict(db_err.constraint().unwrap_or("unknown").to_string())
        }
        other => StoreError::backend(other),
    }
}
