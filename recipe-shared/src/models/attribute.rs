/// Recipe attributes: owned, named rows linked to recipes
///
/// Tags and ingredients have the same shape (`id`, `user_id`, `name`) and
/// the same relationship to recipes (a many-to-many link table). The
/// [`RecipeAttribute`] trait names the tables involved; the functions in this
/// module implement the store operations once for both.
///
/// Every function that reads owned rows takes the owner's user id. Nothing
/// here returns a row belonging to somebody else.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// A named row owned by a user and attachable to recipes
pub trait RecipeAttribute:
    for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static
{
    /// Table holding the rows
    const TABLE: &'static str;

    /// Link table joining recipes to rows of `TABLE`
    const LINK_TABLE: &'static str;

    /// Column of `LINK_TABLE` referencing `TABLE`
    const LINK_COLUMN: &'static str;

    /// Field name used when reporting errors about these rows
    const FIELD: &'static str;

    fn id(&self) -> i64;

    fn name(&self) -> &str;
}

/// Lists the owner's rows, ordered by name descending
///
/// With `assigned_only`, only rows attached to at least one of the owner's
/// recipes are returned. Each row appears once regardless of how many
/// recipes reference it.
pub async fn list<A: RecipeAttribute>(
    pool: &SqlitePool,
    owner_id: i64,
    assigned_only: bool,
) -> Result<Vec<A>, sqlx::Error> {
    let mut sql = format!("SELECT a.id, a.user_id, a.name FROM {} a WHERE a.user_id = ?", A::TABLE);

    if assigned_only {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM {link} l JOIN recipes r ON r.id = l.recipe_id \
             WHERE l.{col} = a.id AND r.user_id = ?)",
            link = A::LINK_TABLE,
            col = A::LINK_COLUMN,
        ));
    }

    sql.push_str(" ORDER BY a.name DESC, a.id DESC");

    let mut query = sqlx::query_as::<_, A>(&sql).bind(owner_id);
    if assigned_only {
        query = query.bind(owner_id);
    }

    let rows = query.fetch_all(pool).await?;
    debug!(table = A::TABLE, owner_id, assigned_only, count = rows.len(), "Listed attributes");

    Ok(rows)
}

/// Creates a row owned by `owner_id`
pub async fn create<A: RecipeAttribute>(
    pool: &SqlitePool,
    owner_id: i64,
    name: &str,
) -> Result<A, sqlx::Error> {
    let row = sqlx::query_as::<_, A>(&format!(
        "INSERT INTO {} (user_id, name) VALUES (?, ?) RETURNING id, user_id, name",
        A::TABLE
    ))
    .bind(owner_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    info!(table = A::TABLE, id = row.id(), owner_id, name = row.name(), "Created attribute");
    Ok(row)
}

/// Returns the first id in `ids` that is not one of the owner's rows
///
/// None means every id is owned by `owner_id`.
pub async fn find_unowned<A: RecipeAttribute>(
    conn: &mut SqliteConnection,
    owner_id: i64,
    ids: &[i64],
) -> Result<Option<i64>, sqlx::Error> {
    let wanted: BTreeSet<i64> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(None);
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT id FROM {} WHERE user_id = ", A::TABLE));
    qb.push_bind(owner_id);
    qb.push(" AND id IN (");
    let mut separated = qb.separated(", ");
    for id in &wanted {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let owned: BTreeSet<i64> = qb
        .build_query_scalar::<i64>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

    Ok(wanted.difference(&owned).next().copied())
}

/// Replaces the full set of rows linked to a recipe
///
/// Existing links are removed and exactly `ids` are attached. An empty slice
/// clears the relation. Duplicates in `ids` are ignored. Callers verify
/// ownership first (see [`find_unowned`]) and run this inside the same
/// transaction as the recipe write.
pub async fn replace_links<A: RecipeAttribute>(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {} WHERE recipe_id = ?", A::LINK_TABLE))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "INSERT INTO {} (recipe_id, {}) ",
        A::LINK_TABLE,
        A::LINK_COLUMN
    ));
    qb.push_values(&unique, |mut row, id| {
        row.push_bind(recipe_id).push_bind(*id);
    });
    qb.build().execute(&mut *conn).await?;

    debug!(link_table = A::LINK_TABLE, recipe_id, count = unique.len(), "Replaced links");
    Ok(())
}

/// Ids linked to each of the given recipes, in ascending id order
///
/// Recipes without links are absent from the map.
pub async fn linked_ids<A: RecipeAttribute>(
    pool: &SqlitePool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<i64>>, sqlx::Error> {
    let mut linked: HashMap<i64, Vec<i64>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(linked);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT recipe_id, {} FROM {} WHERE recipe_id IN (",
        A::LINK_COLUMN,
        A::LINK_TABLE
    ));
    let mut separated = qb.separated(", ");
    for id in recipe_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    qb.push(format!(" ORDER BY recipe_id, {}", A::LINK_COLUMN));

    let pairs = qb
        .build_query_as::<(i64, i64)>()
        .fetch_all(pool)
        .await?;

    for (recipe_id, attribute_id) in pairs {
        linked.entry(recipe_id).or_default().push(attribute_id);
    }

    Ok(linked)
}

/// Full rows linked to one recipe, in ascending id order
pub async fn linked_to<A: RecipeAttribute>(
    pool: &SqlitePool,
    recipe_id: i64,
) -> Result<Vec<A>, sqlx::Error> {
    sqlx::query_as::<_, A>(&format!(
        "SELECT a.id, a.user_id, a.name FROM {table} a \
         JOIN {link} l ON l.{col} = a.id \
         WHERE l.recipe_id = ? ORDER BY a.id",
        table = A::TABLE,
        link = A::LINK_TABLE,
        col = A::LINK_COLUMN,
    ))
    .bind(recipe_id)
    .fetch_all(pool)
    .await
}
