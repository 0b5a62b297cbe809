//! User session row.

use sqlx::FromRow;
use tollgate_core::models::Session;
use tollgate_core::types::{DbId, Timestamp};

/// A row from the `user_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            refresh_token_hash: row.refresh_token_hash,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
        }
    }
}
