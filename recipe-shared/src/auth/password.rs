/// Password hashing using Argon2id
///
/// Hashes are stored in PHC string format, so the parameters travel with the
/// hash and can be raised later without invalidating existing accounts.
///
/// # Parameters
///
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2 passes
/// - **Parallelism**: 1 lane
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use recipe_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Test123")?;
///
/// assert!(verify_password("Test123", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::Rng;
use std::sync::OnceLock;

/// Prefix marking a password that can never match
///
/// A PHC hash always starts with `$`, so nothing a user types can collide
/// with this marker.
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";

/// Hash checked when a login has no real hash to check against
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password using Argon2id
///
/// A fresh 16-byte salt is drawn from the OS RNG for every call.
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Unusable passwords never verify. Comparison of real hashes is
/// constant-time inside `argon2`.
///
/// # Errors
///
/// Returns an error if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if !is_password_usable(hash) {
        run_dummy_verification(password);
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Runs one full Argon2 verification against a fixed hash
///
/// Login attempts for unknown accounts (or accounts without a password)
/// call this, so they cost the same as a wrong password. The fixed hash is
/// built with the same parameters as [`hash_password`] on first use.
pub fn run_dummy_verification(password: &str) {
    let hash = DUMMY_HASH.get_or_init(|| hash_password("dummy-password-never-matches").ok());

    if let Some(hash) = hash {
        let _ = verify_password(password, hash);
    }
}

/// Produces a stored value that no password will ever match
///
/// Used for accounts created without a password. The random suffix keeps
/// two such accounts from sharing an identical stored value.
pub fn make_unusable_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let suffix: String = (0..40)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
}

/// Whether a stored value is a real password hash
pub fn is_password_usable(hash: &str) -> bool {
    !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("Test123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=19456"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_unusable_password_never_verifies() {
        let stored = make_unusable_password();

        assert!(!is_password_usable(&stored));
        assert!(!verify_password("", &stored).unwrap());
        assert!(!verify_password(&stored, &stored).unwrap());
        assert_ne!(stored, make_unusable_password());
    }

    #[test]
    fn test_dummy_verification_uses_real_parameters() {
        run_dummy_verification("anything");

        let hash = DUMMY_HASH.get().cloned().flatten().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=19456"));
        assert!(hash.contains("t=2"));
        assert!(!verify_password("anything", &hash).unwrap());
    }

    #[test]
    fn test_unusable_password_still_runs_verifier() {
        let stored = make_unusable_password();

        assert!(!verify_password("guess", &stored).unwrap());
        assert!(DUMMY_HASH.get().is_some());
    }

    #[test]
    fn test_real_hash_is_usable() {
        let hash = hash_password("Test123").unwrap();
        assert!(is_password_usable(&hash));
    }
}
