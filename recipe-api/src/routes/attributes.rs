/// Tag and ingredient endpoints
///
/// Tags and ingredients behave identically, so each handler is written once
/// and mounted per type (`list::<Tag>`, `create::<Ingredient>`, ...).
///
/// # Endpoints
///
/// - `GET /recipe/tags`, `GET /recipe/ingredients` - List own rows, name descending
/// - `POST /recipe/tags`, `POST /recipe/ingredients` - Create an owned row
///
/// # Query Parameters
///
/// - `assigned_only=1`: only rows used by at least one of the caller's recipes

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use recipe_shared::{
    auth::middleware::AuthContext,
    models::attribute::{self, RecipeAttribute},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// List query
#[derive(Debug, Default, Deserialize)]
pub struct AttributeQuery {
    /// Non-zero restricts the list to rows assigned to a recipe
    pub assigned_only: Option<i64>,
}

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAttributeRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// List the caller's rows
pub async fn list<A>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<AttributeQuery>,
) -> ApiResult<Json<Vec<A>>>
where
    A: RecipeAttribute + Serialize,
{
    let assigned_only = query.assigned_only.unwrap_or(0) != 0;

    let rows = attribute::list::<A>(&state.db, auth.user_id, assigned_only).await?;

    Ok(Json(rows))
}

/// Create a row owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: Name missing, blank or too long
pub async fn create<A>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateAttributeRequest>,
) -> ApiResult<(StatusCode, Json<A>)>
where
    A: RecipeAttribute + Serialize,
{
    req.validate()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "This field may not be blank."));
    }

    let row = attribute::create::<A>(&state.db, auth.user_id, name).await?;

    Ok((StatusCode::CREATED, Json(row)))
}
