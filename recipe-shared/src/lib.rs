//! # Recipe Shared Library
//!
//! Types, storage and business logic used by the recipe API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool, migrations and the startup readiness gate
//! - `auth`: Password hashing, opaque tokens and request authentication
//! - `models`: Users, tokens, tags, ingredients and recipes with their store operations
//! - `media`: Validation and storage of uploaded images

pub mod auth;
pub mod db;
pub mod media;
pub mod models;

/// Current version of the recipe shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
