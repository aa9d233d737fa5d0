//! Argon2id password hashing.
//!
//! Hashing is CPU-bound, so both operations run on the blocking thread pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

/// Errors from hashing or verifying a password.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The stored hash is not a valid PHC string, or hashing failed.
    #[error("Password hash error: {0}")]
    Hash(String),

    /// The blocking task was cancelled or panicked.
    #[error("Password task failed: {0}")]
    Task(String),
}

impl From<password_hash::Error> for PasswordError {
    fn from(error: password_hash::Error) -> Self {
        Self::Hash(error.to_string())
    }
}

impl From<tokio::task::JoinError> for PasswordError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Task(error.to_string())
    }
}

/// Hashes `password` with Argon2id and a random salt, returning a PHC string.
///
/// # Errors
///
/// Returns `PasswordError` if hashing fails.
pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(PasswordError::from)
    })
    .await?
}

/// Checks `password` against a stored PHC string.
///
/// Returns `Ok(false)` on a mismatch.
///
/// # Errors
///
/// Returns `PasswordError` if the stored hash cannot be parsed.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(&stored_hash)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(error) => Err(PasswordError::from(error)),
        }
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("battery staple".to_string(), hash).await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_hashes_are_salted() {
        let first = hash_password("same".to_string()).await.unwrap();
        let second = hash_password("same".to_string()).await.unwrap();
        assert_ne!(first, second);
    }

    #[rstest]
    #[tokio::test]
    async fn test_verify_rejects_malformed_hash() {
        let result = verify_password("anything".to_string(), "not-a-phc-string".to_string()).await;
        assert!(matches!(result, Err(PasswordError::Hash(_))));
    }
}
