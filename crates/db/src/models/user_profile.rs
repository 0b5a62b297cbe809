use sqlx::FromRow;
use tollgate_core::models::UserProfile;
use tollgate_core::types::{DbId, Timestamp};

/// A row from the `user_profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        UserProfile {
            id: row.id,
            user_id: row.user_id,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        }
    }
}
