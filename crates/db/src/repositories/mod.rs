//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&mut PgConnection` as the first argument, so the same query runs on a
//! pooled connection or inside an open transaction.

pub mod session_repo;
pub mod user_profile_repo;
pub mod user_provider_repo;
pub mod user_repo;

pub use session_repo::SessionRepo;
pub use user_profile_repo::UserProfileRepo;
pub use user_provider_repo::UserProviderRepo;
pub use user_repo::UserRepo;
