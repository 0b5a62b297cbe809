//! Credential and session lifecycle.
//!
//! - [`jwt`] -- access-token minting/validation and refresh-token helpers.
//! - [`password`] -- Argon2id password hashing.
//! - [`oauth`] -- Google authorization-code provider.
//! - [`orchestrator`] -- login, OAuth login, refresh rotation and logout.

pub mod jwt;
pub mod oauth;
pub mod orchestrator;
pub mod password;
