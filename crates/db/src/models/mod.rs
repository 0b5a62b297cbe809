//! Row types for the auth tables.
//!
//! Each row converts into the matching `tollgate_core::models` record; nothing
//! outside this crate sees sqlx types.

pub mod session;
pub mod user;
pub mod user_profile;
pub mod user_provider;
