//! Password hashing with Argon2id.
//!
//! Hashing and verification run on the blocking pool so concurrent sign-in
//! attempts cannot starve the async runtime.

use crate::config::{AppError, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use tracing::error;

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    const MEMORY_COST: u32 = 19_456;
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;
    const OUTPUT_LEN: usize = 32;

    /// Creates a hasher with the OWASP-recommended Argon2id parameters.
    ///
    /// # Panics
    ///
    /// Panics if the built-in parameters are rejected, which cannot happen
    /// for the constants above.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            Self::MEMORY_COST,
            Self::TIME_COST,
            Self::PARALLELISM,
            Some(Self::OUTPUT_LEN),
        )
        .expect("Invalid Argon2 parameters");

        Self { params }
    }

    /// Creates a hasher with custom cost parameters. Intended for tests,
    /// where the production memory cost is needlessly slow.
    ///
    /// # Panics
    ///
    /// Panics if the parameters are out of range for Argon2.
    #[must_use]
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        let params = Params::new(memory_cost, time_cost, parallelism, Some(Self::OUTPUT_LEN))
            .expect("Invalid Argon2 parameters");

        Self { params }
    }

    /// Hashes a password into PHC string format.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails or the blocking task panics.
    pub async fn hash(&self, password: String) -> Result<String> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Password hash task panicked");
            AppError::Password("hashing failed".to_string())
        })?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AppError::Password("hashing failed".to_string())
        })
    }

    /// Verifies a password against a stored PHC-format hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash cannot be parsed or the blocking
    /// task panics. A wrong password is `Ok(false)`, not an error.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|e| {
                error!(error = %e, "Failed to parse stored password hash");
                AppError::Password("verification failed".to_string())
            })?;

            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Password verify task panicked");
            AppError::Password("verification failed".to_string())
        })?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
