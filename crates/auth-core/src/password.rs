//! Password hashing boundary

use argon2::Argon2;
use async_trait::async_trait;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};

use crate::error::{AuthError, Result};

/// Password hashing primitive
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String>;

    async fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id hasher
///
/// Hashing is CPU-bound and runs on the blocking pool so a login burst cannot
/// stall unrelated requests on the async runtime.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Custom cost parameters (memory in KiB). Useful for tests and
    /// low-resource deployments.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = argon2::Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| AuthError::Config(format!("invalid argon2 parameters: {err}")))?;
        Ok(Self {
            argon2: Argon2::new(
                argon2::Algorithm::Argon2id,
                argon2::Version::V0x13,
                params,
            ),
        })
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| AuthError::Hashing(err.to_string()))
        })
        .await
        .map_err(|err| AuthError::Hashing(format!("hashing task failed: {err}")))?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hash) else {
                // Unparseable stored hash reads as a mismatch, not an error.
                return Ok(false);
            };
            Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|err| AuthError::Hashing(format!("verification task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2PasswordHasher {
        // Cheap parameters keep the test suite fast.
        Argon2PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("Abc12345!").await.unwrap();
        assert_ne!(hash, "Abc12345!");
        assert!(hasher.verify("Abc12345!", &hash).await.unwrap());
        assert!(!hasher.verify("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("Abc12345!").await.unwrap();
        let second = hasher.hash("Abc12345!").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn garbage_stored_hash_never_matches() {
        let hasher = hasher();
        assert!(!hasher.verify("Abc12345!", "not-a-phc-string").await.unwrap());
    }
}
