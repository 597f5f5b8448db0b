/// Database models for the recipe service
///
/// Each model carries its own CRUD operations as associated functions.
/// Everything a user owns is read and written through functions that take
/// the owner's id explicitly.
///
/// # Models
///
/// - `user`: User accounts and password checks
/// - `auth_token`: Opaque login tokens (hashed at rest)
/// - `tag`, `ingredient`: Owned labels attachable to recipes, sharing the
///   store operations in `attribute`
/// - `recipe`: Recipes with their tag and ingredient links
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::attribute;
/// use recipe_shared::models::tag::Tag;
/// use recipe_shared::models::user::{CreateUser, User};
/// use recipe_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create_user(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password: Some("testpass123".to_string()),
///     name: "Test User".to_string(),
/// }).await?;
///
/// let tag: Tag = attribute::create(&pool, user.id, "Vegan").await?;
/// # Ok(())
/// # }
/// ```

pub mod attribute;
pub mod auth_token;
pub mod ingredient;
pub mod recipe;
pub mod tag;
pub mod user;
