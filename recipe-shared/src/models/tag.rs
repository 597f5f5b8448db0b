/// Tag model
///
/// A tag is a short label a user attaches to their own recipes
/// ("vegan", "dessert"). Store operations live in [`super::attribute`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL
/// );
/// ```

use super::attribute::RecipeAttribute;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,

    /// Owner
    #[serde(skip_serializing)]
    pub user_id: i64,

    pub name: String,
}

impl RecipeAttribute for Tag {
    const TABLE: &'static str = "tags";
    const LINK_TABLE: &'static str = "recipe_tags";
    const LINK_COLUMN: &'static str = "tag_id";
    const FIELD: &'static str = "tags";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
