//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings, so the parameters travel with each hash
//! and can be raised later without invalidating existing accounts.
//!
//! Parameters:
//! - m_cost: 19 MiB
//! - t_cost: 2 iterations
//! - p_cost: 1

use anyhow::Context;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tokio::task;

const DEFAULT_M_COST_KIB: u32 = 19_456;
const DEFAULT_T_COST: u32 = 2;
const DEFAULT_P_COST: u32 = 1;

fn argon2() -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(DEFAULT_M_COST_KIB, DEFAULT_T_COST, DEFAULT_P_COST, None)
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password and return a PHC-encoded Argon2id hash string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);

    let hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?
        .to_string();

    Ok(hash)
}

/// Verify a plaintext password against a PHC-encoded Argon2 hash.
///
/// Returns `Ok(false)` on mismatch and `Err(_)` when the stored hash is
/// malformed.
pub fn verify_password(password: &str, password_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    match argon2()?.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Failed to verify password: {e}")),
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> anyhow::Result<String> {
    task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task panicked")?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(
    password: String,
    password_hash: String,
) -> anyhow::Result<bool> {
    task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_phc_argon2id() {
        let hash = hash_password("pw123").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"), "unexpected hash: {hash}");
    }

    #[test]
    fn test_verify_matches_only_original_password() {
        let hash = hash_password("pw123").unwrap();

        assert!(verify_password("pw123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let first = hash_password("pw123").unwrap();
        let second = hash_password("pw123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("pw123", "plaintext-password").is_err());
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hash = hash_password_blocking("pw123".to_owned()).await.unwrap();
        assert!(
            verify_password_blocking("pw123".to_owned(), hash)
                .await
                .unwrap()
        );
    }
}
