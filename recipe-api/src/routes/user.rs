/// User endpoints
///
/// This module provides account endpoints:
/// - Registration
/// - Token login
/// - The caller's own profile
///
/// # Endpoints
///
/// - `POST /user/create` - Register new user
/// - `POST /user/token` - Exchange email and password for a token
/// - `GET /user/me` - Own profile
/// - `PUT /user/me` - Replace own profile
/// - `PATCH /user/me` - Update parts of own profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use recipe_shared::{
    auth::middleware::AuthContext,
    models::{
        auth_token::AuthToken,
        user::{CreateUser, UpdateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

/// Shown for every failed login, whatever the cause
const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Email address
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,

    /// Optional display name
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// Full profile replacement
#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// Partial profile update
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

/// Public view of a user; the password never leaves the server
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque token for the `Authorization: Token <token>` header
    pub token: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /user/create
/// Content-Type: application/json
///
/// {
///   "email": "test@example.com",
///   "password": "testpass",
///   "name": "Test name"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"email": "...", "name": "..."}`
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or email already registered
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;

    let user = User::create_user(
        &state.db,
        CreateUser {
            email: req.email,
            password: Some(req.password),
            name: req.name,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange credentials for a token
///
/// Each successful call issues a new token.
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, unknown email, wrong password or inactive account
pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let user = User::authenticate(&state.db, &req.email, &req.password)
        .await?
        .ok_or_else(|| {
            debug!("Rejected login attempt");
            ApiError::field("non_field_errors", INVALID_CREDENTIALS)
        })?;

    let (_, token) = AuthToken::issue(&state.db, user.id).await?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse { token }))
}

/// Own profile
pub async fn retrieve_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Replace own profile
///
/// Email and password are required; an omitted name is cleared.
pub async fn replace_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<ReplaceUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let changes = UpdateUser {
        email: Some(req.email),
        password: Some(req.password),
        name: Some(req.name),
    };

    save_profile(&state, &auth, changes).await
}

/// Update parts of own profile
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let changes = UpdateUser {
        email: req.email,
        password: req.password,
        name: req.name,
    };

    save_profile(&state, &auth, changes).await
}

async fn save_profile(
    state: &AppState,
    auth: &AuthContext,
    changes: UpdateUser,
) -> ApiResult<Json<UserResponse>> {
    let user = User::update(&state.db, auth.user_id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(user_id = user.id, "Updated profile");
    Ok(Json(user.into()))
}
