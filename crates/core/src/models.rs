//! Domain records handled by the session lifecycle.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// A login session. Identified by `id`, looked up by `refresh_token_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

impl Session {
    /// A session is active iff it was never revoked and has not expired.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Time left until `expires_at`, clamped at zero.
    pub fn remaining(&self, now: Timestamp) -> std::time::Duration {
        (self.expires_at - now).to_std().unwrap_or_default()
    }
}

/// Input for [`crate::store::SessionStore::create`]. The store assigns `id`
/// and `created_at`.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
}

/// One login method of a user.
///
/// `provider_id` is the email for password logins and the external subject id
/// for OAuth logins. Only password providers carry a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProvider {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub provider_id: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUserProvider {
    pub provider: String,
    pub provider_id: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewUserProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}
