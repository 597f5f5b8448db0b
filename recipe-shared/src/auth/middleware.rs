/// Token authentication for Axum
///
/// Resolves the `Authorization` header of a request to an active user and
/// produces an [`AuthContext`] that handlers receive through request
/// extensions.
///
/// # Accepted Headers
///
/// - `Authorization: Token <key>`
/// - `Authorization: Bearer <key>`
///
/// Anything else (missing header, other scheme, unknown or malformed key,
/// inactive user) is rejected with 401 Unauthorized.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use recipe_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.email)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use super::token::parse_authorization;
use crate::models::auth_token::AuthToken;
use crate::models::user::User;

/// Authentication context added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    /// Authenticated user ID; every store call is scoped to it
    pub user_id: i64,

    pub email: String,

    pub is_staff: bool,

    pub is_superuser: bool,
}

impl AuthContext {
    /// Creates auth context for an authenticated user
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

/// Error type for token authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    /// Authorization header with an unsupported scheme
    #[error("Invalid token header.")]
    InvalidFormat,

    /// Unknown token, or token of an inactive user
    #[error("Invalid token.")]
    InvalidToken,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// Returns `AuthError` when the request carries no valid token.
pub async fn authenticate(pool: &SqlitePool, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let token = parse_authorization(value).ok_or(AuthError::InvalidFormat)?;

    let user = AuthToken::authenticate(pool, token)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    debug!(user_id = user.id, "Authenticated request");
    Ok(AuthContext::from_user(&user))
}
