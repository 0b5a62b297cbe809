//! Domain types and collaborator contracts for the session lifecycle.
//!
//! Nothing in this crate performs I/O. Storage, cache and OAuth adapters live
//! in `tollgate-db`, `tollgate-cache` and `tollgate-api`, and plug in through
//! the traits in [`store`], [`cache`], [`oauth`] and [`password`].

pub mod cache;
pub mod context;
pub mod email;
pub mod error;
pub mod models;
pub mod oauth;
pub mod password;
pub mod store;
pub mod types;
