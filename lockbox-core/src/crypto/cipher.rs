//! AES-256-GCM encryption of stored credential passwords.
//!
//! Each secret is sealed into an opaque token:
//! base64( nonce(12 bytes) || ciphertext || auth tag(16 bytes) )
//! with a fresh random nonce per encryption. One process-wide key; no
//! key rotation or multi-key support, so key backup is the caller's
//! responsibility.

use crate::crypto::{CryptoError, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use zeroize::Zeroize;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The symmetric key used to encrypt and decrypt credential passwords.
///
/// Constructed once by the application root from configuration and
/// passed into the entry vault, never held as a hidden global. Tests
/// substitute a throwaway key via [`SecretCipher::generate`].
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    /// Generate a cipher with a fresh random key
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self { key: key.into() }
    }

    /// Build a cipher from raw key bytes
    pub fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Build a cipher from a base64-encoded 32-byte key, the form the
    /// key takes in configuration
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("not valid base64: {}", e)))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidKey(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self { key })
    }

    /// Base64 encoding of the key, for writing out generated keys
    pub fn key_base64(&self) -> String {
        BASE64.encode(self.key)
    }

    /// Encrypt a plaintext secret into an opaque authenticated token
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(&self.key.into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(token))
    }

    /// Decrypt a token back to the plaintext secret.
    ///
    /// Fails closed with [`CryptoError::DecryptionFailed`] on any
    /// malformed, truncated, tampered, or foreign token.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let raw = BASE64
            .decode(token.trim())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new(&self.key.into());
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl Drop for SecretCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material through Debug output
        f.write_str("SecretCipher([redacted])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = SecretCipher::generate();
        let plaintext = "correct horse battery staple";

        let token = cipher.encrypt(plaintext).unwrap();
        assert_ne!(token, plaintext);

        let decrypted = cipher.decrypt(&token).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_different_tokens_for_same_plaintext() {
        let cipher = SecretCipher::generate();

        let token1 = cipher.encrypt("secret123").unwrap();
        let token2 = cipher.encrypt("secret123").unwrap();

        // Fresh nonce each time, so tokens differ
        assert_ne!(token1, token2);
        assert_eq!(cipher.decrypt(&token1).unwrap(), "secret123");
        assert_eq!(cipher.decrypt(&token2).unwrap(), "secret123");
    }

    #[test]
    fn test_tampering_detected_at_every_byte() {
        let cipher = SecretCipher::generate();
        let token = cipher.encrypt("sensitive").unwrap();
        let mut raw = BASE64.decode(&token).unwrap();

        for i in 0..raw.len() {
            raw[i] ^= 0x01;
            let tampered = BASE64.encode(&raw);
            assert!(
                cipher.decrypt(&tampered).is_err(),
                "flipping byte {} was not detected",
                i
            );
            raw[i] ^= 0x01;
        }
    }

    #[test]
    fn test_foreign_key_fails() {
        let cipher1 = SecretCipher::generate();
        let cipher2 = SecretCipher::generate();

        let token = cipher1.encrypt("secret").unwrap();
        assert!(matches!(
            cipher2.decrypt(&token),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_garbage_input_fails() {
        let cipher = SecretCipher::generate();

        assert!(cipher.decrypt("").is_err());
        assert!(cipher.decrypt("not base64 at all!!!").is_err());
        // Valid base64 but far too short to hold nonce + tag
        assert!(cipher.decrypt(&BASE64.encode(b"tiny")).is_err());
    }

    #[test]
    fn test_key_base64_roundtrip() {
        let cipher = SecretCipher::generate();
        let encoded = cipher.key_base64();

        let restored = SecretCipher::from_base64(&encoded).unwrap();
        let token = cipher.encrypt("portable").unwrap();
        assert_eq!(restored.decrypt(&token).unwrap(), "portable");
    }

    #[test]
    fn test_from_base64_rejects_bad_keys() {
        assert!(SecretCipher::from_base64("@@@").is_err());
        assert!(SecretCipher::from_base64(&BASE64.encode(b"short")).is_err());
    }

    #[test]
    fn test_empty_plaintext_roundtrips() {
        // Entry validation rejects empty passwords upstream, but the
        // cipher itself should not choke on them.
        let cipher = SecretCipher::generate();
        let token = cipher.encrypt("").unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), "");
    }
}
