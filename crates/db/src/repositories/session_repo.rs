//! Repository for the `user_sessions` table.

use sqlx::PgConnection;
use tollgate_core::models::NewSession;
use tollgate_core::types::DbId;

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, refresh_token_hash, user_agent, ip_address, \
                       created_at, expires_at, revoked_at";

/// Provides session persistence. Rows are never deleted here.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewSession,
    ) -> Result<SessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, user_agent, ip_address, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(&input.user_agent)
            .bind(&input.ip_address)
            .bind(input.expires_at)
            .fetch_one(conn)
            .await
    }

    /// Find a session by its refresh token hash, regardless of expiry or
    /// revocation.
    pub async fn find_by_refresh_token_hash(
        conn: &mut PgConnection,
        hash: &str,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE refresh_token_hash = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(hash)
            .fetch_optional(conn)
            .await
    }

    /// Revoke a single session if it is not revoked yet.
    ///
    /// Returns `Some(true)` if this call revoked it, `Some(false)` if it was
    /// already revoked (the original `revoked_at` is kept), `None` if no such
    /// session exists. The conditional update is a single row write, so two
    /// concurrent callers can never both observe `Some(true)`.
    pub async fn revoke(conn: &mut PgConnection, id: DbId) -> Result<Option<bool>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(Some(true));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_sessions WHERE id = $1)")
                .bind(id)
                .fetch_one(conn)
                .await?;
        Ok(exists.then_some(false))
    }
}
