use std::sync::Arc;

use crate::error::ApiError;

/// One-way password hashing. Implementations are CPU-bound; call them
/// through [`hash_blocking`] and [`verify_blocking`] from async code.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, bcrypt::BcryptError>;

    /// `Ok(false)` on mismatch; errors are reserved for unusable hashes.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, bcrypt::BcryptError>;
}

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(plaintext, self.cost)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(plaintext, hash)
    }
}

pub async fn hash_blocking(hasher: Arc<dyn PasswordHasher>, plaintext: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

pub async fn verify_blocking(
    hasher: Arc<dyn PasswordHasher>,
    plaintext: String,
    hash: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}
