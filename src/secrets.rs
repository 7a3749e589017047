//! One-way hashing for passwords and refresh-token secrets.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Hashing failed on abnormal input.
#[derive(Debug, Error)]
#[error("secret hashing failed")]
pub struct HashError;

/// Argon2id hasher with a server-side pepper.
///
/// One abstraction covers both login passwords and refresh-token
/// secrets: the store never holds either in plaintext.
#[derive(Clone)]
pub struct SecretHasher {
    pepper: String,
}

impl SecretHasher {
    pub fn new(pepper: String) -> Self {
        Self { pepper }
    }

    /// Hash `secret` with a fresh random salt. Two calls over the same
    /// input produce different digests; only verification ties them
    /// together.
    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        let peppered = format!("{}{}", secret, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| HashError)?
            .to_string())
    }

    /// Verify `secret` against a digest produced by [`SecretHasher::hash`].
    ///
    /// A mismatch, or an unparsable digest, is `false` rather than an
    /// error.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        let peppered = format!("{}{}", secret, self.pepper);
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed)
            .is_ok()
    }
}
