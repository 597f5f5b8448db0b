//! # Recipe API Server
//!
//! HTTP API for managing recipes, tags and ingredients, with token
//! authentication and image uploads.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment
//! 2. Wait for the database and connect the pool
//! 3. Run migrations
//! 4. Create the bootstrap superuser (if configured)
//! 5. Serve until Ctrl+C / SIGTERM
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p recipe-api
//! ```

use anyhow::Context;
use recipe_api::{
    app::{build_router, AppState},
    config::Config,
    startup::{bootstrap_superuser, connect_database},
};
use recipe_shared::db::{migrations::run_migrations, pool::close_pool};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Recipe API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = connect_database(&config)
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    if let Some(admin) = &config.admin {
        bootstrap_superuser(&pool, admin)
            .await
            .context("Failed to create superuser")?;
    }

    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("Failed to create media root {}", config.media.root.display()))?;

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;

    info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    info!("Server shutdown complete");
    Ok(())
}

/// Installs the global subscriber
///
/// `RUST_LOG` selects what is logged; `LOG_FORMAT=json` switches to
/// one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recipe_api=debug,recipe_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
