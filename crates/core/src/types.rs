/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Provider name used for email + password logins.
pub const PASSWORD_PROVIDER: &str = "password";
