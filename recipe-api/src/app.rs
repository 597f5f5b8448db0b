/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use recipe_api::{app::AppState, config::Config};
/// use recipe_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(pool, config);
/// let app = recipe_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use recipe_shared::{
    auth::middleware::authenticate,
    media::MediaStore,
    models::{ingredient::Ingredient, tag::Tag},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Uploaded file storage
    pub media: MediaStore,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let media = MediaStore::new(config.media.root.clone(), config.media.url.clone());

        Self {
            db,
            config: Arc::new(config),
            media,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /user/
/// │   ├── POST /create                 # Register (public)
/// │   ├── POST /token                  # Obtain token (public)
/// │   └── GET|PUT|PATCH /me            # Own profile (token)
/// ├── /recipe/                         # All routes require a token
/// │   ├── GET|POST /tags
/// │   ├── GET|POST /ingredients
/// │   ├── GET|POST /recipes
/// │   ├── GET|PUT|PATCH|DELETE /recipes/:id
/// │   └── POST /recipes/:id/upload-image
/// └── <MEDIA_URL>/...                  # Uploaded files (public, read-only)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Body size limit
/// 4. Token authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Registration and login (public)
    let public_user_routes = Router::new()
        .route("/create", post(routes::user::create_user))
        .route("/token", post(routes::user::create_token));

    let me_routes = Router::new()
        .route(
            "/me",
            get(routes::user::retrieve_me)
                .put(routes::user::replace_me)
                .patch(routes::user::update_me),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            token_auth_layer,
        ));

    let recipe_routes = Router::new()
        .route(
            "/tags",
            get(routes::attributes::list::<Tag>).post(routes::attributes::create::<Tag>),
        )
        .route(
            "/ingredients",
            get(routes::attributes::list::<Ingredient>)
                .post(routes::attributes::create::<Ingredient>),
        )
        .route(
            "/recipes",
            get(routes::recipes::list_recipes).post(routes::recipes::create_recipe),
        )
        .route(
            "/recipes/:id",
            get(routes::recipes::retrieve_recipe)
                .put(routes::recipes::replace_recipe)
                .patch(routes::recipes::update_recipe)
                .delete(routes::recipes::delete_recipe),
        )
        .route("/recipes/:id/upload-image", post(routes::recipes::upload_image))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            token_auth_layer,
        ));

    let mut router = Router::new()
        .merge(health_routes)
        .nest("/user", public_user_routes.merge(me_routes))
        .nest("/recipe", recipe_routes);

    // Uploaded files are only served locally when the media URL is a path
    let media_url = state.media.base_url();
    if media_url.starts_with('/') && media_url.len() > 1 {
        router = router.nest_service(media_url, ServeDir::new(state.media.root()));
    } else {
        warn!(media_url, "Media URL is not a local path; uploads will not be served");
    }

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    router
        .layer(DefaultBodyLimit::max(state.config.media.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Token authentication middleware layer
///
/// Resolves the `Authorization` header to an active user and injects an
/// `AuthContext` into request extensions. Every failure is a 401.
async fn token_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.db, req.headers()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
