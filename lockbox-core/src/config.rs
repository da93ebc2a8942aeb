//! Application configuration, read from the environment.

use crate::{LockboxError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default inactivity window before a session expires (30 minutes)
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;

/// Recognized configuration for the application root.
///
/// All values come from environment variables:
/// - `LOCKBOX_DB_PATH` - path to the SQLite database file
/// - `LOCKBOX_ENCRYPTION_KEY` - base64-encoded 32-byte cipher key (required)
/// - `LOCKBOX_SESSION_SECRET` - cookie-signing secret for an HTTP shell
/// - `LOCKBOX_SESSION_TIMEOUT_SECS` - session inactivity window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub db_path: PathBuf,
    pub encryption_key: String,
    /// Consumed by the front-end shell for cookie signing; the core
    /// only carries it.
    pub session_secret: Option<String>,
    pub session_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// The encryption key is mandatory: without it stored secrets can
    /// be neither written nor read.
    pub fn from_env() -> Result<Self> {
        let encryption_key = std::env::var("LOCKBOX_ENCRYPTION_KEY").map_err(|_| {
            LockboxError::Validation("LOCKBOX_ENCRYPTION_KEY is not set".to_string())
        })?;

        let db_path = std::env::var("LOCKBOX_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("lockbox.db"));

        let session_timeout_secs = match std::env::var("LOCKBOX_SESSION_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                LockboxError::Validation(
                    "LOCKBOX_SESSION_TIMEOUT_SECS must be a number of seconds".to_string(),
                )
            })?,
            Err(_) => DEFAULT_SESSION_TIMEOUT_SECS,
        };

        Ok(Self {
            db_path,
            encryption_key,
            session_secret: std::env::var("LOCKBOX_SESSION_SECRET").ok(),
            session_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecretCipher;

    #[test]
    fn test_config_key_feeds_cipher() {
        let config = Config {
            db_path: PathBuf::from(":memory:"),
            encryption_key: SecretCipher::generate().key_base64(),
            session_secret: None,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        };

        assert!(SecretCipher::from_base64(&config.encryption_key).is_ok());
    }

    #[test]
    fn test_default_timeout_is_thirty_minutes() {
        assert_eq!(DEFAULT_SESSION_TIMEOUT_SECS, 1800);
    }
}
