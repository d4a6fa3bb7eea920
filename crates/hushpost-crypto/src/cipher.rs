//! Symmetric encryption under a caller-held secret
//!
//! XChaCha20-Poly1305 with the random nonce prepended to the ciphertext, so
//! a sealed blob is self-contained. Used for vault fields at rest, the
//! encrypted key seed, and federation MACs.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};

use crate::error::{CryptoError, Result};
use crate::hash::{digest, random_bytes};

/// Key size (256 bits)
pub const KEY_SIZE: usize = 32;

/// Nonce size for XChaCha20-Poly1305 (192 bits)
pub const NONCE_SIZE: usize = 24;

/// Symmetric cipher bound to one key
#[derive(Clone)]
pub struct SecretCipher {
    cipher: XChaCha20Poly1305,
}

impl SecretCipher {
    /// Create from a raw 256-bit key
    pub fn from_key(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(key.into()),
        }
    }

    /// Create from an arbitrary secret string (key = SHA-256 of the secret)
    pub fn from_secret(secret: &str) -> Self {
        let key = digest(&[secret.as_bytes()]);
        Self::from_key(&key)
    }

    /// Encrypt, returning nonce-prefixed ciphertext
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes = random_bytes::<NONCE_SIZE>();
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed("XChaCha20-Poly1305 failed".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a nonce-prefixed blob; None on any failure
    pub fn open(&self, blob: &[u8]) -> Option<Vec<u8>> {
        if blob.len() < NONCE_SIZE {
            return None;
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
        let nonce = XNonce::from_slice(nonce_bytes);

        self.cipher.decrypt(nonce, ciphertext).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let cipher = SecretCipher::from_key(&[0x42; KEY_SIZE]);
        let plaintext = b"nothing to see here";

        let blob = cipher.seal(plaintext).unwrap();
        let opened = cipher.open(&blob).unwrap();

        assert_eq!(plaintext.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = SecretCipher::from_key(&[0x42; KEY_SIZE]);
        let other = SecretCipher::from_key(&[0x43; KEY_SIZE]);

        let blob = cipher.seal(b"secret").unwrap();
        assert!(other.open(&blob).is_none());
    }

    #[test]
    fn test_tampered_blob_fails() {
        let cipher = SecretCipher::from_key(&[0x42; KEY_SIZE]);

        let mut blob = cipher.seal(b"secret").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;

        assert!(cipher.open(&blob).is_none());
    }

    #[test]
    fn test_truncated_blob_fails() {
        let cipher = SecretCipher::from_key(&[0x42; KEY_SIZE]);
        assert!(cipher.open(&[0u8; 5]).is_none());
    }

    #[test]
    fn test_from_secret_deterministic() {
        let a = SecretCipher::from_secret("relay shared secret");
        let b = SecretCipher::from_secret("relay shared secret");

        let blob = a.seal(b"probe").unwrap();
        assert_eq!(b.open(&blob).unwrap(), b"probe");
    }

    #[test]
    fn test_seal_randomized() {
        let cipher = SecretCipher::from_key(&[0x42; KEY_SIZE]);
        let a = cipher.seal(b"same input").unwrap();
        let b = cipher.seal(b"same input").unwrap();
        assert_ne!(a, b);
    }
}
