/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`token`]: Opaque token generation, hashing and header parsing
/// - [`middleware`]: Request authentication producing an [`middleware::AuthContext`]
///
/// # Example
///
/// ```
/// use recipe_shared::auth::password::{hash_password, verify_password};
/// use recipe_shared::auth::token::generate_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let (token, token_hash) = generate_token();
/// # Ok(())
/// # }
/// ```

pub mod middleware;
pub mod password;
pub mod token;
