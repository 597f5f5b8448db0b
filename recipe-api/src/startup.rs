/// Server startup steps
///
/// - Connect to the database, waiting until it answers
/// - Create the configured superuser if it does not exist yet
///
/// Both run before the router is built; a failure here aborts startup.

use crate::config::{AdminConfig, Config};
use recipe_shared::db::pool::{create_pool, DatabaseConfig};
use recipe_shared::db::wait::{wait_for_db, WaitPolicy};
use recipe_shared::models::user::{User, UserError};
use sqlx::SqlitePool;
use tracing::info;

/// Connects the pool, retrying per `DATABASE_CONNECT_RETRIES` and
/// `DATABASE_RETRY_INTERVAL_SECS`
pub async fn connect_database(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    // An in-memory database must keep its single connection for the pool's lifetime
    let base = if config.database.url.contains(":memory:") {
        DatabaseConfig::in_memory()
    } else {
        DatabaseConfig::default()
    };

    let db_config = DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..base
    };

    let policy = WaitPolicy {
        interval: config.retry_interval(),
        max_attempts: config.database.connect_retries,
    };

    wait_for_db(policy, || create_pool(db_config.clone())).await
}

/// Creates the bootstrap superuser unless an account with that email exists
///
/// Returns true if a user was created. An existing account is left
/// untouched, including its password.
pub async fn bootstrap_superuser(pool: &SqlitePool, admin: &AdminConfig) -> Result<bool, UserError> {
    if User::find_by_email(pool, &admin.email).await?.is_some() {
        info!(email = %admin.email, "Superuser already exists");
        return Ok(false);
    }

    let user = User::create_superuser(pool, &admin.email, &admin.password).await?;
    info!(user_id = user.id, email = %user.email, "Created superuser");

    Ok(true)
}
