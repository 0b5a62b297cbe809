//! User row, joined with its optional profile.

use sqlx::FromRow;
use tollgate_core::models::{User, UserProfile};
use tollgate_core::types::{DbId, Timestamp};

/// A `users` row LEFT JOINed with `user_profiles`. Profile columns are all
/// `NULL` when the user has no profile.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub profile_id: Option<DbId>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_created_at: Option<Timestamp>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let profile = match (row.profile_id, row.display_name, row.profile_created_at) {
            (Some(id), Some(display_name), Some(created_at)) => Some(UserProfile {
                id,
                user_id: row.id,
                display_name,
                avatar_url: row.avatar_url,
                created_at,
            }),
            _ => None,
        };
        User {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
            profile,
        }
    }
}
