//! Repository for the `user_providers` table.

use sqlx::PgConnection;
use tollgate_core::models::NewUserProvider;
use tollgate_core::types::DbId;

use crate::models::user_provider::UserProviderRow;

const COLUMNS: &str = "id, user_id, provider, provider_id, password_hash";

pub struct UserProviderRepo;

impl UserProviderRepo {
    /// Find the login method `(provider, provider_id)`.
    pub async fn find(
        conn: &mut PgConnection,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<UserProviderRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_providers WHERE provider = $1 AND provider_id = $2"
        );
        sqlx::query_as::<_, UserProviderRow>(&query)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(conn)
            .await
    }

    /// Attach a login method to `user_id`.
    pub async fn create(
        conn: &mut PgConnection,
        user_id: DbId,
        input: &NewUserProvider,
    ) -> Result<UserProviderRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_providers (user_id, provider, provider_id, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProviderRow>(&query)
            .bind(user_id)
            .bind(&input.provider)
            .bind(&input.provider_id)
            .bind(&input.password_hash)
            .fetch_one(conn)
            .await
    }
}
