//! # Secret Values
//!
//! Password fields hold Argon2id hashes, never plaintext.
//!
//! ## Invariants
//! - Plaintext shorter than the field minimum is rejected before hashing
//! - Only [`SecretHash::from_hash`] accepts an existing hash; document text
//!   is always treated as plaintext

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::{ConversionError, ConversionResult};

/// An Argon2 password hash in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    /// Minimum plaintext length when a field declares none
    pub const DEFAULT_MIN_LENGTH: usize = 8;

    /// Hashes `plaintext` after checking it against `min_length` characters.
    pub fn create(plaintext: &str, min_length: usize) -> ConversionResult<Self> {
        let actual_length = plaintext.chars().count();
        if actual_length < min_length {
            return Err(ConversionError::PasswordTooShort {
                actual_length,
                minimum_length: min_length,
            });
        }

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| SecretHash(hash.to_string()))
            .map_err(|e| ConversionError::InvalidValue(format!("password hashing failed: {}", e)))
    }

    /// Wraps an existing hash.
    pub fn from_hash(hash: &str) -> ConversionResult<Self> {
        if Self::is_hash(hash) {
            Ok(SecretHash(hash.to_string()))
        } else {
            Err(ConversionError::InvalidValue("not an Argon2 hash".into()))
        }
    }

    /// Determines whether `value` is an Argon2 PHC string.
    pub fn is_hash(value: &str) -> bool {
        PasswordHash::new(value)
            .map(|hash| hash.algorithm.as_str().starts_with("argon2"))
            .unwrap_or(false)
    }

    /// Checks a plaintext password against this hash.
    pub fn verify(&self, plaintext: &str) -> bool {
        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(..)")
    }
}
