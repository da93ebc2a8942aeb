//! Input validation for registration: password strength and email
//! syntax.

use crate::{LockboxError, Result};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// The symbols accepted by the strength gate (ASCII punctuation)
const SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Check a candidate account password against the registration rules.
///
/// Rules are applied in a fixed order and the first failure wins, so
/// the user gets one specific message at a time:
/// minimum length 8, then uppercase, lowercase, digit, and symbol
/// requirements.
pub fn check_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(LockboxError::Validation(
            "Password must be at least 8 characters long.".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(LockboxError::Validation(
            "Password must contain at least one uppercase letter.".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(LockboxError::Validation(
            "Password must contain at least one lowercase letter.".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(LockboxError::Validation(
            "Password must contain at least one number.".to_string(),
        ));
    }
    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        return Err(LockboxError::Validation(
            "Password must contain at least one special character.".to_string(),
        ));
    }
    Ok(())
}

/// Check email syntax (local@domain.tld)
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
