//! Secure random password generation.
//!
//! Draws from letters, digits, and punctuation using the operating
//! system's CSPRNG.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;

/// Default length for generated passwords
pub const DEFAULT_LENGTH: usize = 16;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Generate a random password of the given length.
///
/// The result always contains at least one lowercase letter, one
/// uppercase letter, one digit, and one symbol (for lengths >= 4), so
/// generated passwords pass the registration strength gate. Character
/// positions are shuffled to avoid a predictable prefix.
pub fn generate_password(length: usize) -> String {
    let pool: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    let mut rng = OsRng;

    let mut password: Vec<u8> = Vec::with_capacity(length);
    for class in [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS] {
        if password.len() < length {
            password.push(*class.choose(&mut rng).unwrap());
        }
    }
    while password.len() < length {
        password.push(*pool.choose(&mut rng).unwrap());
    }

    password.shuffle(&mut rng);
    password.into_iter().map(char::from).collect()
}

/// Generate a password of the default length (16 characters)
pub fn generate_default_password() -> String {
    generate_password(DEFAULT_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_length() {
        assert_eq!(generate_default_password().len(), 16);
    }

    #[test]
    fn test_custom_length() {
        assert_eq!(generate_password(32).len(), 32);
        assert_eq!(generate_password(8).len(), 8);
    }

    #[test]
    fn test_charset_membership() {
        let allowed: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
        let password = generate_password(64);
        assert!(password.bytes().all(|b| allowed.contains(&b)));
    }

    #[test]
    fn test_contains_all_classes() {
        let password = generate_password(16);
        assert!(password.bytes().any(|b| b.is_ascii_lowercase()));
        assert!(password.bytes().any(|b| b.is_ascii_uppercase()));
        assert!(password.bytes().any(|b| b.is_ascii_digit()));
        assert!(password.bytes().any(|b| b.is_ascii_punctuation()));
    }

    #[test]
    fn test_passwords_are_unique() {
        let p1 = generate_password(16);
        let p2 = generate_password(16);
        assert_ne!(p1, p2);
    }

    #[test]
    fn test_passes_strength_gate() {
        for _ in 0..16 {
            let password = generate_default_password();
            assert!(crate::validate::check_password_strength(&password).is_ok());
        }
    }
}
