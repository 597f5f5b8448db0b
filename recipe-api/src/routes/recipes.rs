/// Recipe endpoints
///
/// # Endpoints
///
/// - `GET /recipe/recipes` - List own recipes, newest first
/// - `POST /recipe/recipes` - Create a recipe
/// - `GET /recipe/recipes/:id` - Recipe with tags and ingredients expanded
/// - `PUT /recipe/recipes/:id` - Replace a recipe (omitted relations are cleared)
/// - `PATCH /recipe/recipes/:id` - Update parts of a recipe
/// - `DELETE /recipe/recipes/:id` - Delete a recipe
/// - `POST /recipe/recipes/:id/upload-image` - Attach an image (multipart field `image`)
///
/// # Query Parameters
///
/// - `tags=1,2`: recipes linked to tag 1 or tag 2
/// - `ingredients=3`: recipes linked to ingredient 3
///
/// Both filters together must each match.
///
/// A recipe owned by someone else answers 404 on every `:id` route.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiMultipart, ApiPath, ApiQuery},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use recipe_shared::{
    auth::middleware::AuthContext,
    media::MediaStore,
    models::{
        attribute,
        ingredient::Ingredient,
        recipe::{NewRecipe, Recipe, RecipeChanges, RecipeFilter},
        tag::Tag,
    },
};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};
use validator::Validate;

const NOT_FOUND: &str = "No Recipe matches the given query.";

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

/// List query
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    /// Comma-separated tag ids
    pub tags: Option<String>,

    /// Comma-separated ingredient ids
    pub ingredients: Option<String>,
}

impl RecipeQuery {
    fn into_filter(self) -> ApiResult<RecipeFilter> {
        Ok(RecipeFilter {
            tags: parse_ids("tags", self.tags.as_deref())?,
            ingredients: parse_ids("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// Create or full replace request
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeRequest {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub title: String,

    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: i64,

    #[serde(deserialize_with = "deserialize_price")]
    pub price: Decimal,

    #[serde(default)]
    pub tags: Vec<i64>,

    #[serde(default)]
    pub ingredients: Vec<i64>,
}

/// Partial update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub title: Option<String>,

    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_optional_price")]
    pub price: Option<Decimal>,

    pub tags: Option<Vec<i64>>,

    pub ingredients: Option<Vec<i64>>,
}

/// Recipe as returned by list, create and update
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i64,
    pub price: Decimal,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
    pub image: Option<String>,
}

/// Recipe with its relations expanded
#[derive(Debug, Serialize)]
pub struct RecipeDetailResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i64,
    pub price: Decimal,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
    pub image: Option<String>,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: i64,
    pub image: Option<String>,
}

impl RecipeResponse {
    fn new(recipe: Recipe, tags: Vec<i64>, ingredients: Vec<i64>, media: &MediaStore) -> Self {
        Self {
            id: recipe.id,
            image: recipe.image.as_deref().map(|path| media.url_for(path)),
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            tags,
            ingredients,
        }
    }
}

/// List the caller's recipes
///
/// # Errors
///
/// - `400 Bad Request`: A filter is not a comma-separated list of ids
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<RecipeQuery>,
) -> ApiResult<Json<Vec<RecipeResponse>>> {
    let filter = query.into_filter()?;

    let recipes = Recipe::list(&state.db, auth.user_id, &filter).await?;

    Ok(Json(summarize(&state, recipes).await?))
}

/// Create a recipe
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or a tag/ingredient id is not the caller's
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<RecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeResponse>)> {
    req.validate()?;

    let recipe = Recipe::create(
        &state.db,
        auth.user_id,
        NewRecipe {
            title: req.title,
            time_minutes: req.time_minutes,
            price: req.price,
            tags: req.tags,
            ingredients: req.ingredients,
        },
    )
    .await?;

    let response = summarize_one(&state, recipe).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Recipe detail with tags and ingredients expanded
pub async fn retrieve_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let recipe = find_owned(&state, &auth, id).await?;

    let tags = recipe.tags(&state.db).await?;
    let ingredients = recipe.ingredients(&state.db).await?;

    Ok(Json(RecipeDetailResponse {
        id: recipe.id,
        image: recipe.image.as_deref().map(|path| state.media.url_for(path)),
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        tags,
        ingredients,
    }))
}

/// Replace a recipe
///
/// Every field is rewritten. Omitted `tags` or `ingredients` clear the relation.
pub async fn replace_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    req.validate()?;

    let changes = RecipeChanges {
        title: Some(req.title),
        time_minutes: Some(req.time_minutes),
        price: Some(req.price),
        tags: Some(req.tags),
        ingredients: Some(req.ingredients),
    };

    save_changes(&state, &auth, id, changes).await
}

/// Update parts of a recipe
///
/// Supplied relations are replaced wholesale; omitted ones are kept.
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateRecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    req.validate()?;

    let changes = RecipeChanges {
        title: req.title,
        time_minutes: req.time_minutes,
        price: req.price,
        tags: req.tags,
        ingredients: req.ingredients,
    };

    save_changes(&state, &auth, id, changes).await
}

/// Delete a recipe
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if !Recipe::delete(&state.db, auth.user_id, id).await? {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attach an image to a recipe
///
/// The payload is decoded before anything is written; a rejected upload
/// leaves the recipe's current image in place.
///
/// # Errors
///
/// - `400 Bad Request`: No `image` field, or the file is not a readable image
/// - `404 Not Found`: Recipe missing or owned by someone else
/// - `413 Payload Too Large`: Body over `MAX_UPLOAD_BYTES`
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> ApiResult<Json<RecipeImageResponse>> {
    find_owned(&state, &auth, id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let filename = field.file_name().map(str::to_string);
            let data = field.bytes().await?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::field(IMAGE_FIELD, "No file was submitted."))?;

    let path = state
        .media
        .save_recipe_image(filename.as_deref(), data)
        .await
        .map_err(|e| {
            warn!(recipe_id = id, error = %e, "Rejected recipe image");
            ApiError::from(e)
        })?;

    let recipe = attach_image(&state, auth.user_id, id, &path).await?;

    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image: recipe.image.as_deref().map(|path| state.media.url_for(path)),
    }))
}

/// Points one of the owner's recipes at a stored file
///
/// If the recipe is gone (deleted while the upload was in flight) or the
/// update fails, the file is removed again.
pub async fn attach_image(
    state: &AppState,
    owner_id: i64,
    id: i64,
    path: &str,
) -> ApiResult<Recipe> {
    let attached = Recipe::set_image(&state.db, owner_id, id, path)
        .await
        .map_err(ApiError::from)
        .and_then(|recipe| recipe.ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string())));

    match &attached {
        Ok(recipe) => info!(recipe_id = recipe.id, path = %path, "Attached recipe image"),
        Err(_) => {
            if let Err(e) = state.media.remove(path).await {
                warn!(recipe_id = id, path = %path, error = %e, "Failed to remove orphaned image");
            }
        }
    }

    attached
}

async fn find_owned(state: &AppState, auth: &AuthContext, id: i64) -> ApiResult<Recipe> {
    Recipe::find_owned(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

async fn save_changes(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    changes: RecipeChanges,
) -> ApiResult<Json<RecipeResponse>> {
    let recipe = Recipe::update(&state.db, auth.user_id, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))?;

    Ok(Json(summarize_one(state, recipe).await?))
}

async fn summarize_one(state: &AppState, recipe: Recipe) -> ApiResult<RecipeResponse> {
    let mut summaries = summarize(state, vec![recipe]).await?;
    summaries
        .pop()
        .ok_or_else(|| ApiError::InternalError("Recipe vanished while serializing".to_string()))
}

/// Attaches linked ids to recipes, two queries regardless of count
async fn summarize(state: &AppState, recipes: Vec<Recipe>) -> ApiResult<Vec<RecipeResponse>> {
    let ids: Vec<i64> = recipes.iter().map(|recipe| recipe.id).collect();

    let mut tags: HashMap<i64, Vec<i64>> = attribute::linked_ids::<Tag>(&state.db, &ids).await?;
    let mut ingredients = attribute::linked_ids::<Ingredient>(&state.db, &ids).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| {
            let id = recipe.id;
            RecipeResponse::new(
                recipe,
                tags.remove(&id).unwrap_or_default(),
                ingredients.remove(&id).unwrap_or_default(),
                &state.media,
            )
        })
        .collect())
}

/// Parses a comma-separated id list; empty input means no filter
fn parse_ids(field: &str, raw: Option<&str>) -> ApiResult<Vec<i64>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(|part| {
            part.trim().parse::<i64>().map_err(|_| {
                ApiError::field(field, format!("\"{}\" is not a valid id.", part.trim()))
            })
        })
        .collect()
}

/// Prices arrive as JSON strings ("5.25") or numbers (5.25)
#[derive(Deserialize)]
#[serde(untagged)]
enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

impl PriceInput {
    fn parse<E: de::Error>(self) -> Result<Decimal, E> {
        let text = match self {
            PriceInput::Text(text) => text,
            PriceInput::Number(number) => number.to_string(),
        };

        let text = text.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|_| E::custom("price: A valid number is required."))
    }
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    PriceInput::deserialize(deserializer)?.parse()
}

fn deserialize_optional_price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<PriceInput>::deserialize(deserializer)?
        .map(PriceInput::parse)
        .transpose()
}
