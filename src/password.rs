//! Credential hashing
//!
//! bcrypt digests with a configurable work factor. Hashing is CPU-bound,
//! so both operations run on the blocking pool.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash credential: {0}")]
    Hash(String),

    #[error("Failed to compare credential: {0}")]
    Compare(String),
}

pub type Result<T> = std::result::Result<T, PasswordError>;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let cost = self.cost;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Compare a candidate against a stored digest. A mismatch is
    /// `Ok(false)`, not an error.
    pub async fn verify(&self, password: &str, hashed: &str) -> Result<bool> {
        let password = password.to_string();
        let hashed = hashed.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
            .await
            .map_err(|e| PasswordError::Compare(e.to_string()))?
            .map_err(|e| PasswordError::Compare(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps the test fast
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();
        let digest = hasher.hash("hunter2").await.unwrap();

        assert_ne!(digest, "hunter2");
        assert!(hasher.verify("hunter2", &digest).await.unwrap());
        assert!(!hasher.verify("wrong", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("same").await.unwrap();
        let second = hasher.hash("same").await.unwrap();
        assert_ne!(first, second);
    }
}
