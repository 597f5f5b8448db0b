//! Common test utilities for API tests
//!
//! This module provides shared infrastructure for the API tests:
//! - Private in-memory database with migrations applied
//! - Temporary media root
//! - Test user creation and token issuing
//! - Request helpers against the router

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use recipe_api::app::{build_router, AppState};
use recipe_api::config::Config;
use recipe_shared::db::migrations::run_migrations;
use recipe_shared::db::pool::{create_pool, DatabaseConfig};
use recipe_shared::models::auth_token::AuthToken;
use recipe_shared::models::user::{CreateUser, User};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::Service as _;

pub const TEST_PASSWORD: &str = "testpass123";

const BOUNDARY: &str = "recipe-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub state: AppState,
    pub app: Router,
    pub user: User,
    pub token: String,

    /// Media root; removed when the context drops
    pub media: TempDir,
}

/// Status and decoded JSON body of a response
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestContext {
    /// Creates a context with a fresh database and one authenticated user
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestContext::new`], with a hook to adjust the configuration
    pub async fn with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let db = create_pool(DatabaseConfig::in_memory()).await?;
        run_migrations(&db).await?;

        let media = tempfile::tempdir()?;

        let mut config = Config::default();
        config.media.root = media.path().to_path_buf();
        config.media.url = "/media/".to_string();
        configure(&mut config);

        let user = create_user(&db, "user@example.com").await?;
        let (_, token) = AuthToken::issue(&db, user.id).await?;

        let state = AppState::new(db.clone(), config);
        let app = build_router(state.clone());

        Ok(Self {
            db,
            state,
            app,
            user,
            token,
            media,
        })
    }

    /// Authorization header value for the context user
    pub fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Registers another user and returns them with a token
    pub async fn other_user(&self, email: &str) -> anyhow::Result<(User, String)> {
        let user = create_user(&self.db, email).await?;
        let (_, token) = AuthToken::issue(&self.db, user.id).await?;
        Ok((user, token))
    }

    /// Sends a request, authenticated as the context user
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send_as(Some(&self.token), method, uri, body).await
    }

    /// Sends a request with an explicit token, or none
    pub async fn send_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    /// Uploads a single multipart file field as the context user
    pub async fn upload(&self, uri: &str, field: &str, filename: &str, data: &[u8]) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(field, filename, data)))
            .unwrap();

        self.call(request).await
    }

    /// Runs a request through the router without decoding the response
    pub async fn call_raw(&self, request: Request<Body>) -> Response {
        self.app.clone().call(request).await.unwrap()
    }

    /// Fetches a path without credentials, returning status and raw bytes
    pub async fn get_bytes(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.call_raw(request).await;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, bytes.to_vec())
    }

    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.call_raw(request).await;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }
}

/// Creates a user with the shared test password
pub async fn create_user(db: &SqlitePool, email: &str) -> anyhow::Result<User> {
    let user = User::create_user(
        db,
        CreateUser {
            email: email.to_string(),
            password: Some(TEST_PASSWORD.to_string()),
            name: "Test User".to_string(),
        },
    )
    .await?;

    Ok(user)
}

/// Encodes one file field as `multipart/form-data`
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A small valid PNG
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(10, 10, image::Rgb([200, 30, 30]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
