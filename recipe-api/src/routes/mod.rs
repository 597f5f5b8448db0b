/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `user`: Registration, token login and the caller's own profile
/// - `attributes`: Tag and ingredient endpoints (one generic implementation)
/// - `recipes`: Recipe CRUD, filtering and image upload

pub mod attributes;
pub mod health;
pub mod recipes;
pub mod user;
