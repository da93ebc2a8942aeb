//! Cryptographic operations for the password manager.
//!
//! This module provides:
//! - AES-256-GCM credential encryption (opaque token envelope)
//! - Argon2id account-password hashing
//! - Secure random password generation

pub mod cipher;
pub mod generate;
pub mod hash;

pub use cipher::SecretCipher;
pub use generate::generate_password;
pub use hash::{hash_password, verify_password};

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Token is corrupted, truncated, or produced under another key.
    /// Callers treat this as recoverable and render a placeholder.
    #[error("Decryption failed - token is invalid or has been tampered with")]
    DecryptionFailed,

    #[error("Password hashing failed: {0}")]
    HashFailed(String),
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
