//! Shared helpers for store integration tests
//!
//! Every test gets a private in-memory database with the schema applied.

#![allow(dead_code)]

use recipe_shared::db::migrations::run_migrations;
use recipe_shared::db::pool::{create_pool, DatabaseConfig};
use recipe_shared::models::user::{CreateUser, User};
use sqlx::SqlitePool;

/// Fresh migrated in-memory database
pub async fn setup_pool() -> SqlitePool {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create in-memory pool");

    run_migrations(&pool).await.expect("Failed to run migrations");

    pool
}

/// Creates a user with a known password
pub async fn create_user(pool: &SqlitePool, email: &str) -> User {
    User::create_user(
        pool,
        CreateUser {
            email: email.to_string(),
            password: Some("testpass123".to_string()),
            name: "Test User".to_string(),
        },
    )
    .await
    .expect("Failed to create user")
}
