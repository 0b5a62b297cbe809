use sqlx::FromRow;
use tollgate_core::models::UserProvider;
use tollgate_core::types::DbId;

/// A row from the `user_providers` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserProviderRow {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub provider_id: String,
    pub password_hash: Option<String>,
}

impl From<UserProviderRow> for UserProvider {
    fn from(row: UserProviderRow) -> Self {
        UserProvider {
            id: row.id,
            user_id: row.user_id,
            provider: row.provider,
            provider_id: row.provider_id,
            password_hash: row.password_hash,
        }
    }
}
