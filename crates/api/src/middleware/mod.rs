//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the caller identified by a Bearer access token.
//! - [`context::RequestCtx`] -- request metadata and lifetime bounds.

pub mod auth;
pub mod context;
