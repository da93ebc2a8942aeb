//! LockBox core library
//!
//! This library provides the core functionality for the LockBox
//! password manager: authenticated encryption of stored credentials,
//! user accounts, per-user folders, and session handling. The HTTP (or
//! CLI) front end is a thin shell over the operations exposed here.

pub mod config;
pub mod crypto;
pub mod db;
pub mod folders;
pub mod identity;
pub mod session;
pub mod validate;
pub mod vault;

pub use config::Config;
pub use crypto::cipher::SecretCipher;
pub use crypto::generate::generate_password;
pub use crypto::CryptoError;
pub use db::{Database, SchemaCaps, SchemaVersion};
pub use folders::{Folder, FolderRegistry, FolderSummary};
pub use identity::{IdentityStore, User};
pub use session::SessionStore;
pub use vault::{Entry, EntryUpdate, EntryVault, FolderFilter, NewEntry};

use thiserror::Error;

/// Result type for LockBox operations
pub type Result<T> = std::result::Result<T, LockboxError>;

/// Which uniqueness constraint a write collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Username,
    Email,
    FolderName,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKind::Username => write!(f, "username"),
            DuplicateKind::Email => write!(f, "email"),
            DuplicateKind::FolderName => write!(f, "folder name"),
        }
    }
}

/// General error type for LockBox operations
#[derive(Error, Debug)]
pub enum LockboxError {
    /// Bad input, surfaced to the user with a specific message
    #[error("{0}")]
    Validation(String),

    /// Uniqueness-constraint collision, derived from the database
    /// error rather than a pre-check
    #[error("That {0} is already taken.")]
    Duplicate(DuplicateKind),

    /// Entry/folder absent or not owned; a normal outcome, not a fault
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad credentials or no active session. One fixed message so the
    /// caller cannot tell which part was wrong.
    #[error("Invalid credentials.")]
    Auth,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Operation needs a schema feature the live database lacks
    #[error("Database schema does not support {0}")]
    SchemaUnsupported(&'static str),

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}
