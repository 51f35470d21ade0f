// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Hashes passwords into PHC strings.
#[derive(Clone, Default)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Argon2id with the crate's recommended parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id with explicit cost parameters (memory in KiB).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params =
            Params::new(m_cost, t_cost, p_cost, None).map_err(|e| PasswordError(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError(e.to_string()))
    }

    pub fn verify(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| self.argon2.verify_password(password.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> CredentialHasher {
        CredentialHasher::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("wrong horse", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = fast();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_does_not_verify() {
        assert!(!fast().verify("x", "not-a-phc-string"));
    }

    #[test]
    fn test_rejects_invalid_params() {
        assert!(CredentialHasher::with_params(0, 0, 0).is_err());
    }
}
