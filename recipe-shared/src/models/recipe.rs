/// Recipe model and database operations
///
/// A recipe belongs to one user and links to any number of that user's tags
/// and ingredients. Every operation here takes the owner's id; a recipe that
/// exists but belongs to someone else behaves exactly like one that doesn't.
///
/// # Relations
///
/// Tag and ingredient sets are replaced wholesale. Writing `Some(ids)` for a
/// relation removes every existing link and attaches exactly `ids`; `None`
/// leaves the relation untouched. The replacement runs in the same
/// transaction as the recipe write, and ids that are not the owner's rows
/// abort the whole write with [`RecipeError::InvalidRelation`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     time_minutes INTEGER NOT NULL,
///     price TEXT NOT NULL,
///     image TEXT,
///     created_at TIMESTAMP NOT NULL,
///     updated_at TIMESTAMP NOT NULL
/// );
/// ```

use crate::models::attribute::{self, RecipeAttribute};
use crate::models::ingredient::Ingredient;
use crate::models::tag::Tag;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

const RECIPE_COLUMNS: &str =
    "id, user_id, title, time_minutes, price, image, created_at, updated_at";

/// Digits allowed after the decimal point of a price
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Total digits allowed in a price
pub const PRICE_MAX_DIGITS: u32 = 5;

/// Recipe record
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,

    /// Owner of the recipe
    #[serde(skip_serializing)]
    pub user_id: i64,

    pub title: String,

    pub time_minutes: i64,

    /// Always carries two decimal places
    pub price: Decimal,

    /// Path of the stored image relative to the media root
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Recipe {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let price: String = row.try_get("price")?;
        let price = Decimal::from_str(&price).map_err(|e| sqlx::Error::ColumnDecode {
            index: "price".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            time_minutes: row.try_get("time_minutes")?,
            price,
            image: row.try_get("image")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for creating a recipe
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i64,
    pub price: Decimal,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// Changes to apply to an existing recipe
///
/// `None` fields are left as they are. For `tags` and `ingredients`,
/// `Some(vec![])` clears the relation.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<Decimal>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// Restricts a recipe listing
///
/// A recipe matches a non-empty id list when it links to at least one of
/// the ids. When both lists are given, a recipe must match both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// Errors from the recipe store
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// A linked id is not one of the owner's rows
    #[error("Invalid pk \"{id}\" - object does not exist.")]
    InvalidRelation { field: &'static str, id: i64 },

    /// Price does not fit the stored precision
    #[error("{0}")]
    InvalidPrice(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Checks a price and brings it to two decimal places
///
/// # Errors
///
/// `RecipeError::InvalidPrice` when the price has more than two decimal
/// places or more than five digits in total.
pub fn normalize_price(price: Decimal) -> Result<Decimal, RecipeError> {
    let mut price = price.normalize();

    if price.scale() > PRICE_DECIMAL_PLACES {
        return Err(RecipeError::InvalidPrice(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        )));
    }

    let limit = Decimal::from(10i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price.abs() >= limit {
        return Err(RecipeError::InvalidPrice(format!(
            "Ensure that there are no more than {} digits in total.",
            PRICE_MAX_DIGITS
        )));
    }

    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}

impl Recipe {
    /// Lists the owner's recipes, newest first
    pub async fn list(
        pool: &SqlitePool,
        owner_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.user_id = "));
        qb.push_bind(owner_id);

        push_link_filter::<Tag>(&mut qb, &filter.tags);
        push_link_filter::<Ingredient>(&mut qb, &filter.ingredients);

        qb.push(" ORDER BY r.id DESC");

        let recipes = qb.build_query_as::<Recipe>().fetch_all(pool).await?;
        debug!(owner_id, ?filter, count = recipes.len(), "Listed recipes");

        Ok(recipes)
    }

    /// Finds one of the owner's recipes by id
    pub async fn find_owned(
        pool: &SqlitePool,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    /// Creates a recipe with its tag and ingredient links
    ///
    /// # Errors
    ///
    /// - `RecipeError::InvalidPrice` if the price doesn't fit
    /// - `RecipeError::InvalidRelation` if a tag or ingredient id isn't the owner's
    pub async fn create(
        pool: &SqlitePool,
        owner_id: i64,
        data: NewRecipe,
    ) -> Result<Self, RecipeError> {
        let price = normalize_price(data.price)?;
        let now = Utc::now();

        let mut tx = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (user_id, title, time_minutes, price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(&data.title)
        .bind(data.time_minutes)
        .bind(price.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Self::set_tags(&mut *tx, owner_id, recipe.id, &data.tags).await?;
        Self::set_ingredients(&mut *tx, owner_id, recipe.id, &data.ingredients).await?;

        tx.commit().await?;

        info!(recipe_id = recipe.id, owner_id, "Created recipe");
        Ok(recipe)
    }

    /// Applies changes to one of the owner's recipes
    ///
    /// Returns the updated recipe, or None if the owner has no such recipe.
    pub async fn update(
        pool: &SqlitePool,
        owner_id: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<Self>, RecipeError> {
        let price = changes.price.map(normalize_price).transpose()?;

        let mut tx = pool.begin().await?;

        let mut query = String::from("UPDATE recipes SET updated_at = ?");
        if changes.title.is_some() {
            query.push_str(", title = ?");
        }
        if changes.time_minutes.is_some() {
            query.push_str(", time_minutes = ?");
        }
        if price.is_some() {
            query.push_str(", price = ?");
        }
        query.push_str(&format!(" WHERE id = ? AND user_id = ? RETURNING {RECIPE_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Recipe>(&query).bind(Utc::now());
        if let Some(title) = changes.title {
            q = q.bind(title);
        }
        if let Some(time_minutes) = changes.time_minutes {
            q = q.bind(time_minutes);
        }
        if let Some(price) = price {
            q = q.bind(price.to_string());
        }

        let Some(recipe) = q.bind(id).bind(owner_id).fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };

        if let Some(tags) = changes.tags {
            Self::set_tags(&mut *tx, owner_id, recipe.id, &tags).await?;
        }
        if let Some(ingredients) = changes.ingredients {
            Self::set_ingredients(&mut *tx, owner_id, recipe.id, &ingredients).await?;
        }

        tx.commit().await?;

        info!(recipe_id = recipe.id, owner_id, "Updated recipe");
        Ok(Some(recipe))
    }

    /// Deletes one of the owner's recipes
    ///
    /// Returns true if a recipe was deleted. Links go with it; the tags and
    /// ingredients themselves stay.
    pub async fn delete(pool: &SqlitePool, owner_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(recipe_id = id, owner_id, "Deleted recipe");
        }

        Ok(result.rows_affected() > 0)
    }

    /// Records the stored image path of one of the owner's recipes
    pub async fn set_image(
        pool: &SqlitePool,
        owner_id: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes SET image = ?, updated_at = ? WHERE id = ? AND user_id = ? \
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(image)
        .bind(Utc::now())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the recipe's tags with exactly `ids`
    pub async fn set_tags(
        conn: &mut SqliteConnection,
        owner_id: i64,
        recipe_id: i64,
        ids: &[i64],
    ) -> Result<(), RecipeError> {
        set_links::<Tag>(conn, owner_id, recipe_id, ids).await
    }

    /// Replaces the recipe's ingredients with exactly `ids`
    pub async fn set_ingredients(
        conn: &mut SqliteConnection,
        owner_id: i64,
        recipe_id: i64,
        ids: &[i64],
    ) -> Result<(), RecipeError> {
        set_links::<Ingredient>(conn, owner_id, recipe_id, ids).await
    }

    /// Tags linked to this recipe
    pub async fn tags(&self, pool: &SqlitePool) -> Result<Vec<Tag>, sqlx::Error> {
        attribute::linked_to::<Tag>(pool, self.id).await
    }

    /// Ingredients linked to this recipe
    pub async fn ingredients(&self, pool: &SqlitePool) -> Result<Vec<Ingredient>, sqlx::Error> {
        attribute::linked_to::<Ingredient>(pool, self.id).await
    }
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

async fn set_links<A: RecipeAttribute>(
    conn: &mut SqliteConnection,
    owner_id: i64,
    recipe_id: i64,
    ids: &[i64],
) -> Result<(), RecipeError> {
    if let Some(id) = attribute::find_unowned::<A>(&mut *conn, owner_id, ids).await? {
        debug!(field = A::FIELD, id, owner_id, "Rejected link to foreign row");
        return Err(RecipeError::InvalidRelation { field: A::FIELD, id });
    }

    attribute::replace_links::<A>(conn, recipe_id, ids).await?;
    Ok(())
}

fn push_link_filter<A: RecipeAttribute>(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }

    qb.push(format!(
        " AND EXISTS (SELECT 1 FROM {link} l WHERE l.recipe_id = r.id AND l.{col} IN (",
        link = A::LINK_TABLE,
        col = A::LINK_COLUMN,
    ));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated("))");
}
