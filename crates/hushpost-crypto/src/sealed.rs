//! Anonymous sealed boxes
//!
//! An ephemeral X25519 key agrees with the recipient's exchange key, the
//! shared secret runs through HKDF-SHA256 with both public keys in the info
//! string, and the result keys XChaCha20-Poly1305. Only the holder of the
//! recipient's secret can open the payload; the ephemeral secret is dropped
//! after sealing.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey};

use crate::cipher::NONCE_SIZE;
use crate::error::{CryptoError, Result};
use crate::hash::random_bytes;
use crate::keys::{Keypair, PublicKey};

/// Domain separation for the sealed-box key schedule
const SEAL_INFO: &[u8] = b"hushpost/v1 sealed box";

/// Asymmetrically sealed payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    /// Ephemeral X25519 public key
    #[serde(with = "hex::serde")]
    pub ephemeral: [u8; 32],
    /// XChaCha20-Poly1305 nonce
    #[serde(with = "hex::serde")]
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with authentication tag
    pub ciphertext: Vec<u8>,
}

/// Derive the sealed-box key from the shared secret and both public keys
fn derive_key(shared: &[u8; 32], ephemeral: &[u8; 32], recipient: &[u8; 32]) -> Result<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(None, shared);

    let mut info = Vec::with_capacity(SEAL_INFO.len() + 64);
    info.extend_from_slice(SEAL_INFO);
    info.extend_from_slice(ephemeral);
    info.extend_from_slice(recipient);

    let mut key = [0u8; 32];
    hkdf.expand(&info, &mut key)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expansion failed".to_string()))?;
    Ok(key)
}

/// Seal a payload so only the recipient can open it
pub fn seal_box(recipient: &PublicKey, plaintext: &[u8], aad: &[u8]) -> Result<SealedPayload> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

    let shared = ephemeral_secret.diffie_hellman(recipient.exchange_key());
    let key = derive_key(
        shared.as_bytes(),
        ephemeral_public.as_bytes(),
        recipient.exchange_key().as_bytes(),
    )?;

    let nonce_bytes = random_bytes::<NONCE_SIZE>();
    let cipher = XChaCha20Poly1305::new(&key.into());
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed("sealed box failed".to_string()))?;

    Ok(SealedPayload {
        ephemeral: *ephemeral_public.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Open a sealed payload; None means "not addressed to this key"
pub fn open_box(recipient: &Keypair, payload: &SealedPayload, aad: &[u8]) -> Option<Vec<u8>> {
    let ephemeral_public = X25519PublicKey::from(payload.ephemeral);
    let shared = recipient.diffie_hellman(&ephemeral_public);

    let recipient_exchange = *recipient.public().exchange_key().as_bytes();
    let key = derive_key(shared.as_bytes(), &payload.ephemeral, &recipient_exchange).ok()?;

    let cipher = XChaCha20Poly1305::new(&key.into());
    cipher
        .decrypt(
            XNonce::from_slice(&payload.nonce),
            Payload {
                msg: &payload.ciphertext,
                aad,
            },
        )
        .ok()
}
