/// User model and database operations
///
/// Users own every tag, ingredient and recipe in the system. Accounts are
/// created through [`User::create_user`] / [`User::create_superuser`], which
/// normalize the email and hash the password before anything is persisted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     email TEXT NOT NULL UNIQUE COLLATE NOCASE,
///     password_hash TEXT NOT NULL,
///     name TEXT NOT NULL DEFAULT '',
///     is_active BOOLEAN NOT NULL DEFAULT 1,
///     is_staff BOOLEAN NOT NULL DEFAULT 0,
///     is_superuser BOOLEAN NOT NULL DEFAULT 0,
///     created_at TIMESTAMP NOT NULL,
///     updated_at TIMESTAMP NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::user::{User, CreateUser};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create_user(&pool, CreateUser {
///     email: "test@TEST.COM".to_string(),
///     password: Some("Test123".to_string()),
///     name: "Test Name".to_string(),
/// }).await?;
///
/// assert_eq!(user.email, "test@test.com");
/// assert!(user.check_password("Test123"));
/// # Ok(())
/// # }
/// ```

use crate::auth::password::{self, PasswordError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, is_active, is_staff, is_superuser, created_at, updated_at";

/// User account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Normalized email address (unique)
    pub email: String,

    /// Argon2id hash, or an unusable marker for password-less accounts
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name (may be empty)
    pub name: String,

    /// Inactive users cannot authenticate
    pub is_active: bool,

    /// May access staff tooling
    pub is_staff: bool,

    /// Has every permission
    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
///
/// The password is plaintext here; it is hashed before it reaches the
/// database. `None` creates an account that cannot log in with a password.
#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub email: String,
    pub password: Option<String>,
    pub name: String,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    /// New email address (normalized before storage)
    pub email: Option<String>,

    /// New plaintext password (hashed before storage)
    pub password: Option<String>,

    /// New display name
    pub name: Option<String>,
}

/// Errors from the user store
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Users must have an email address
    #[error("Users must have an email address")]
    EmptyEmail,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl User {
    /// Normalizes an email address for storage and lookup
    ///
    /// Surrounding whitespace is dropped and the whole address is lowercased,
    /// so `A@B.COM` and `a@b.com` name the same account.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Creates a regular user
    ///
    /// # Errors
    ///
    /// - `UserError::EmptyEmail` if the email is empty after trimming
    /// - `UserError::Database` on a duplicate email or connection failure
    pub async fn create_user(pool: &SqlitePool, data: CreateUser) -> Result<Self, UserError> {
        Self::insert(pool, data, false).await
    }

    /// Creates a user with `is_staff` and `is_superuser` set
    pub async fn create_superuser(
        pool: &SqlitePool,
        email: &str,
        password: &str,
    ) -> Result<Self, UserError> {
        let data = CreateUser {
            email: email.to_string(),
            password: Some(password.to_string()),
            name: String::new(),
        };

        Self::insert(pool, data, true).await
    }

    async fn insert(pool: &SqlitePool, data: CreateUser, superuser: bool) -> Result<Self, UserError> {
        let email = Self::normalize_email(&data.email);
        if email.is_empty() {
            return Err(UserError::EmptyEmail);
        }

        let password_hash = match data.password.as_deref() {
            Some(raw) => password::hash_password(raw)?,
            None => password::make_unusable_password(),
        };

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, is_staff, is_superuser, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&email)
        .bind(password_hash)
        .bind(data.name)
        .bind(superuser)
        .bind(superuser)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        info!(user_id = user.id, superuser, "Created user");
        Ok(user)
    }

    /// Checks a plaintext password against the stored hash
    ///
    /// A malformed stored hash never matches.
    pub fn check_password(&self, raw: &str) -> bool {
        match password::verify_password(raw, &self.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(user_id = self.id, error = %e, "Stored password hash is unreadable");
                false
            }
        }
    }

    /// Resolves an email and password to an active user
    ///
    /// Unknown emails, wrong passwords and inactive accounts all return None,
    /// and every path runs exactly one Argon2 verification.
    pub async fn authenticate(
        pool: &SqlitePool,
        email: &str,
        raw: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(user) = Self::find_by_email(pool, email).await? else {
            password::run_dummy_verification(raw);
            return Ok(None);
        };

        let valid = user.check_password(raw);
        Ok((valid && user.is_active).then_some(user))
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    ///
    /// The lookup address is normalized first.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(Self::normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Updates an existing user
    ///
    /// Returns the updated user, or None if the user doesn't exist.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, UserError> {
        let email = match data.email {
            Some(email) => {
                let email = Self::normalize_email(&email);
                if email.is_empty() {
                    return Err(UserError::EmptyEmail);
                }
                Some(email)
            }
            None => None,
        };

        let password_hash = data
            .password
            .as_deref()
            .map(password::hash_password)
            .transpose()?;

        let mut query = String::from("UPDATE users SET updated_at = ?");
        if email.is_some() {
            query.push_str(", email = ?");
        }
        if password_hash.is_some() {
            query.push_str(", password_hash = ?");
        }
        if data.name.is_some() {
            query.push_str(", name = ?");
        }
        query.push_str(&format!(" WHERE id = ? RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(Utc::now());
        if let Some(email) = email {
            q = q.bind(email);
        }
        if let Some(password_hash) = password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }

        let user = q.bind(id).fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user and, through cascades, everything the user owns
    ///
    /// Returns true if a user was deleted.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(user_id = id, "Deleted user");
        }

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(User::normalize_email("test@TEST.COM"), "test@test.com");
        assert_eq!(User::normalize_email("  A@B.COM "), "a@b.com");
        assert_eq!(User::normalize_email("   "), "");
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.password.is_none());
        assert!(update.name.is_none());
    }

    // Store operations are exercised against a real database in tests/user_store_tests.rs
}
