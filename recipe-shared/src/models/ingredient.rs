/// Ingredient model
///
/// Same shape as [`super::tag::Tag`], tracked separately so a recipe's
/// ingredient list and its labels never mix.

use super::attribute::RecipeAttribute;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,

    #[serde(skip_serializing)]
    pub user_id: i64,

    pub name: String,
}

impl RecipeAttribute for Ingredient {
    const TABLE: &'static str = "ingredients";
    const LINK_TABLE: &'static str = "recipe_ingredients";
    const LINK_COLUMN: &'static str = "ingredient_id";
    const FIELD: &'static str = "ingredients";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
