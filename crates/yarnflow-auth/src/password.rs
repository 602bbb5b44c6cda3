//! Argon2 password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{AuthError, Result};

/// Hash a password into a PHC string with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::Internal` if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch and
/// `AuthError::MalformedHash` if the stored hash cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::MalformedHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}
