//! Repository for the `user_profiles` table.

use sqlx::PgConnection;
use tollgate_core::models::NewUserProfile;
use tollgate_core::types::DbId;

use crate::models::user_profile::UserProfileRow;

pub struct UserProfileRepo;

impl UserProfileRepo {
    /// Insert the profile of `user_id`. A second profile for the same user
    /// violates `uq_user_profiles_user_id`.
    pub async fn create(
        conn: &mut PgConnection,
        user_id: DbId,
        input: &NewUserProfile,
    ) -> Result<UserProfileRow, sqlx::Error> {
        sqlx::query_as::<_, UserProfileRow>(
            "INSERT INTO user_profiles (user_id, display_name, avatar_url)
             VALUES ($1, $2, $3)
             RETURNING id, user_id, display_name, avatar_url, created_at",
        )
        .bind(user_id)
        .bind(&input.display_name)
        .bind(&input.avatar_url)
        .fetch_one(conn)
        .await
    }
}
