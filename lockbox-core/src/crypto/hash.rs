//! Argon2id hashing for account passwords.
//!
//! Account passwords are stored only as PHC strings, which embed the
//! salt and algorithm parameters alongside the hash.

use crate::crypto::{CryptoError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};

/// Hash a password with Argon2id and a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::HashFailed(format!("{}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// Unparseable hashes verify as false rather than erroring, so a
/// corrupted row behaves like a wrong password.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Str0ng!Pass").unwrap();

        assert!(verify_password("Str0ng!Pass", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let h1 = hash_password("same input").unwrap();
        let h2 = hash_password("same input").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_phc_format() {
        let hash = hash_password("anything").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_corrupted_hash_verifies_false() {
        assert!(!verify_password("anything", "not a phc string"));
        assert!(!verify_password("anything", ""));
    }
}
