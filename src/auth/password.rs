//! Password hashing
//!
//! Argon2id with a random per-password salt, stored as a PHC string.
//! Comparison happens inside `verify_password`, which is constant-time
//! over the derived hash.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::RngCore;

use crate::error::AppError;

/// Hash a password into a PHC string
///
/// # Errors
/// Returns `AppError::Encryption` if hashing fails
pub fn hash(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::Encryption(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Encryption(e.to_string()))
}

/// Check a password against a stored PHC string
///
/// Unparsable hashes never match.
pub fn verify(password: &str, hashword: &str) -> bool {
    PasswordHash::new(hashword)
        .ok()
        .as_ref()
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), hash)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let phc = hash("correct horse").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify("correct horse", &phc));
        assert!(!verify("wrong horse", &phc));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash("repeat").unwrap();
        let second = hash("repeat").unwrap();
        assert_ne!(first, second);
        assert!(verify("repeat", &first));
        assert!(verify("repeat", &second));
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify("anything", "not-a-phc-string"));
        assert!(!verify("", ""));
    }
}
