//! Password hashing.
//!
//! User passwords are stored as Argon2id PHC strings. The hasher is a trait so
//! the account service does not depend on one algorithm.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

use espf_core::PasswordHash;

/// Hashing failed.
#[derive(Debug, Error)]
#[error("password hashing error")]
pub struct HashError;

/// One-way password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns `HashError` if the underlying algorithm fails.
    fn hash(&self, password: &str) -> Result<PasswordHash, HashError>;

    /// Check a plaintext password against a stored hash.
    fn verify(&self, password: &str, hash: &PasswordHash) -> bool;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<PasswordHash, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| HashError)
            .and_then(|hash| PasswordHash::new(hash.to_string()).ok_or(HashError))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        let Ok(parsed_hash) = PhcString::new(hash.as_str()) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
