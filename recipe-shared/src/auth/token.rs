/// Opaque auth token utilities
///
/// Tokens are random strings handed to a client once, at login. Only their
/// SHA-256 hash is persisted (see `models::auth_token`), so a leaked
/// database does not leak usable credentials.
///
/// # Token Format
///
/// 40 lowercase hex characters (20 random bytes).
///
/// # Example
///
/// ```
/// use recipe_shared::auth::token::{generate_token, hash_token, validate_token_format};
///
/// let (token, hash) = generate_token();
/// assert_eq!(token.len(), 40);
/// assert!(validate_token_format(&token));
/// assert_eq!(hash, hash_token(&token));
/// ```

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a token
const TOKEN_BYTES: usize = 20;

/// Length of a token in hex characters
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Number of leading characters kept in clear for identification in logs
pub const TOKEN_PREFIX_LENGTH: usize = 8;

/// Authorization schemes accepted in front of a token
const AUTH_SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// Generates a new token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hash)
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let hash = hash_token(&token);

    (token, hash)
}

/// Hashes a token using SHA-256
///
/// Returns the hex-encoded digest (64 characters).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks that a string has the shape of a token
///
/// Lets the auth layer reject garbage without a database round trip.
pub fn validate_token_format(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// First characters of a token, safe to log or display
pub fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LENGTH).collect()
}

/// Extracts the token from an `Authorization` header value
///
/// Accepts `Token <key>` and `Bearer <key>`. Returns None for any other scheme.
///
/// # Example
///
/// ```
/// use recipe_shared::auth::token::parse_authorization;
///
/// assert_eq!(parse_authorization("Token abc"), Some("abc"));
/// assert_eq!(parse_authorization("Bearer abc"), Some("abc"));
/// assert_eq!(parse_authorization("Basic abc"), None);
/// ```
pub fn parse_authorization(header: &str) -> Option<&str> {
    AUTH_SCHEMES
        .iter()
        .find_map(|scheme| header.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
