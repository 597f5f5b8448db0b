/// Auth token model and database operations
///
/// Each successful login issues a fresh opaque token. Only the SHA-256 hash
/// and a short prefix are stored; the plaintext is returned exactly once.
///
/// A user keeps at most [`MAX_TOKENS_PER_USER`] tokens. Issuing one more
/// revokes the oldest, so logging in on a new device eventually signs out
/// the least recently issued session.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE auth_tokens (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash TEXT NOT NULL UNIQUE,
///     token_prefix TEXT NOT NULL,
///     created_at TIMESTAMP NOT NULL,
///     last_used_at TIMESTAMP
/// );
/// ```

use crate::auth::token::{generate_token, hash_token, token_prefix, validate_token_format};
use crate::models::user::User;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Live tokens kept per user; older ones are revoked on login
pub const MAX_TOKENS_PER_USER: i64 = 5;

/// Stored token record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuthToken {
    pub id: i64,

    /// Owner of the token
    pub user_id: i64,

    /// SHA-256 hash of the full token
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// First characters of the token, for display
    pub token_prefix: String,

    pub created_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// Issues a new token for a user
    ///
    /// Returns the stored record and the plaintext token. Tokens beyond the
    /// newest [`MAX_TOKENS_PER_USER`] are deleted in the same transaction.
    pub async fn issue(pool: &SqlitePool, user_id: i64) -> Result<(Self, String), sqlx::Error> {
        let (plaintext, token_hash) = generate_token();
        let mut tx = pool.begin().await?;

        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (user_id, token_hash, token_prefix, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, token_hash, token_prefix, created_at, last_used_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(token_prefix(&plaintext))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let revoked = sqlx::query(
            r#"
            DELETE FROM auth_tokens
            WHERE user_id = ?
              AND id NOT IN (
                SELECT id FROM auth_tokens WHERE user_id = ? ORDER BY id DESC LIMIT ?
              )
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(MAX_TOKENS_PER_USER)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if revoked > 0 {
            info!(user_id, revoked, "Revoked oldest auth tokens");
        }
        debug!(user_id, token_prefix = %token.token_prefix, "Issued auth token");
        Ok((token, plaintext))
    }

    /// Resolves a plaintext token to its active owner
    ///
    /// Returns None for malformed or unknown tokens and for tokens whose
    /// owner has been deactivated. Records the time of use on success.
    pub async fn authenticate(pool: &SqlitePool, plaintext: &str) -> Result<Option<User>, sqlx::Error> {
        if !validate_token_format(plaintext) {
            return Ok(None);
        }

        let token_hash = hash_token(plaintext);

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.name, u.is_active, u.is_staff,
                   u.is_superuser, u.created_at, u.updated_at
            FROM auth_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token_hash = ? AND u.is_active = 1
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(pool)
        .await?;

        if user.is_some() {
            sqlx::query("UPDATE auth_tokens SET last_used_at = ? WHERE token_hash = ?")
                .bind(Utc::now())
                .bind(&token_hash)
                .execute(pool)
                .await?;
        }

        Ok(user)
    }

    /// Lists a user's tokens, newest first
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT id, user_id, token_hash, token_prefix, created_at, last_used_at
            FROM auth_tokens
            WHERE user_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
