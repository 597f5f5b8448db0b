/// Integration tests for the database connection pool
///
/// Each test works on its own SQLite file inside a temporary directory, so
/// tests can run in parallel without sharing state.

use recipe_shared::db::migrations::{get_migration_status, run_migrations};
use recipe_shared::db::pool::{close_pool, create_pool, get_pool_stats, health_check, DatabaseConfig};
use tempfile::TempDir;

fn file_config(dir: &TempDir, max_connections: u32) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
        max_connections,
        min_connections: 1,
        connect_timeout_seconds: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_file_pool_success() {
    let dir = TempDir::new().unwrap();

    let pool = create_pool(file_config(&dir, 5)).await;
    assert!(pool.is_ok(), "Failed to create pool: {:?}", pool.err());

    let pool = pool.unwrap();
    assert!(dir.path().join("test.db").exists());

    let stats = get_pool_stats(&pool);
    assert!(stats.total_connections > 0, "Pool should have at least one connection");

    close_pool(pool).await;
}

#[tokio::test]
async fn test_create_pool_with_unreachable_file() {
    let config = DatabaseConfig {
        url: "sqlite:///nonexistent-dir/for/sure/test.db".to_string(),
        max_connections: 1,
        min_connections: 0,
        connect_timeout_seconds: 2,
        ..Default::default()
    };

    let result = create_pool(config).await;
    assert!(result.is_err(), "Should fail when the file cannot be opened");
}

#[tokio::test]
async fn test_in_memory_pool_is_clamped_to_one_connection() {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 8,
        ..DatabaseConfig::in_memory()
    };

    let pool = create_pool(config).await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");

    // A second connection would see an empty database without the tables
    for _ in 0..5 {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .expect("users table should be visible");
        assert_eq!(count, 0);
    }

    assert_eq!(get_pool_stats(&pool).total_connections, 1);
    close_pool(pool).await;
}

#[tokio::test]
async fn test_pool_concurrent_queries() {
    let dir = TempDir::new().unwrap();
    let pool = create_pool(file_config(&dir, 4)).await.expect("Failed to create pool");

    // More tasks than connections to exercise queueing
    let mut handles = vec![];

    for i in 0..20i64 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let row: (i64,) = sqlx::query_as("SELECT ?")
                .bind(i)
                .fetch_one(&pool)
                .await
                .expect("Failed to execute query");

            assert_eq!(row.0, i);
        }));
    }

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    close_pool(pool).await;
}

#[tokio::test]
async fn test_migrated_file_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let pool = create_pool(file_config(&dir, 2)).await.unwrap();
    run_migrations(&pool).await.unwrap();
    close_pool(pool).await;

    let pool = create_pool(file_config(&dir, 2)).await.unwrap();
    health_check(&pool).await.unwrap();

    let status = get_migration_status(&pool).await.unwrap();
    assert!(status.is_up_to_date);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_foreign_keys_are_enforced() {
    let pool = create_pool(DatabaseConfig::in_memory()).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let result = sqlx::query("INSERT INTO tags (user_id, name) VALUES (?, ?)")
        .bind(999i64)
        .bind("Orphan")
        .execute(&pool)
        .await;

    assert!(result.is_err(), "Insert referencing a missing user must fail");
}
