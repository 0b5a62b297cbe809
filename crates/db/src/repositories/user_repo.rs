//! Repository for the `users` table.

use sqlx::PgConnection;
use tollgate_core::models::NewUser;
use tollgate_core::types::DbId;

use crate::models::user::UserRow;

/// Select list joining the optional profile.
const SELECT_USER: &str = "SELECT u.id, u.email, u.created_at, u.updated_at, \
                           p.id AS profile_id, p.display_name, p.avatar_url, \
                           p.created_at AS profile_created_at \
                           FROM users u LEFT JOIN user_profiles p ON p.user_id = u.id";

/// Provides user lookups and creation. Emails are expected pre-normalized.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row (without profile).
    pub async fn create(conn: &mut PgConnection, input: &NewUser) -> Result<UserRow, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email) VALUES ($1)
             RETURNING id, email, created_at, updated_at,
                       NULL::BIGINT AS profile_id, NULL::TEXT AS display_name,
                       NULL::TEXT AS avatar_url, NULL::TIMESTAMPTZ AS profile_created_at",
        )
        .bind(&input.email)
        .fetch_one(conn)
        .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("{SELECT_USER} WHERE u.id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("{SELECT_USER} WHERE LOWER(u.email) = LOWER($1)");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(conn)
            .await
    }

    pub async fn exists(conn: &mut PgConnection, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
            .bind(email)
            .fetch_one(conn)
            .await
    }
}
