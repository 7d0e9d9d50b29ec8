//! Argon2 password hashing
//!
//! Hashing is deliberately slow, so request handlers use the `_blocking`
//! variants, which run on tokio's blocking pool.

use std::sync::LazyLock;

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};

/// Verified against when an email is unknown, so that lookups of unknown and
/// known accounts cost the same
static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("decoy-password-never-issued").ok());

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored PHC hash string
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

pub async fn verify_password_blocking(password: String, password_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash)).await?
}

/// Run one verification against the decoy hash; the outcome is discarded
pub async fn verify_decoy(password: String) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        if let Some(hash) = DECOY_HASH.as_deref() {
            verify_password(&password, hash)?;
        }
        Ok(())
    })
    .await?
}
