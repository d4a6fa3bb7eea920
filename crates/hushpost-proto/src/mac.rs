//! Federation MACs
//!
//! Relays in a trusted federation share a secret string per peering. A MAC
//! is the envelope's content hash encrypted under that secret; the receiving
//! relay decrypts and compares. Decrypt-and-match rather than a bare keyed
//! hash, so a MAC observed on one envelope reveals nothing reusable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use hushpost_crypto::{constant_time_eq, digest, SecretCipher};

use crate::error::Result;

/// Fixed tag for connection probes (no envelope involved)
const PROBE_TAG: &[u8] = b"hushpost/v1 probe";

/// Shared-secret MAC over an envelope's content hash
pub struct PeerMac;

impl PeerMac {
    /// Produce a MAC for the given content hash
    pub fn seal(secret: &str, content_hash: &[u8; 32]) -> Result<String> {
        let blob = SecretCipher::from_secret(secret).seal(content_hash)?;
        Ok(BASE64.encode(blob))
    }

    /// Check a MAC against the expected content hash
    pub fn verify(secret: &str, content_hash: &[u8; 32], mac: &str) -> bool {
        let blob = match BASE64.decode(mac.trim()) {
            Ok(blob) => blob,
            Err(_) => return false,
        };

        match SecretCipher::from_secret(secret).open(&blob) {
            Some(opened) => constant_time_eq(&opened, content_hash),
            None => false,
        }
    }

    /// MAC over the fixed probe tag, for checking a configured secret
    pub fn seal_probe(secret: &str) -> Result<String> {
        Self::seal(secret, &digest(&[PROBE_TAG]))
    }

    /// Verify a probe MAC
    pub fn verify_probe(secret: &str, mac: &str) -> bool {
        Self::verify(secret, &digest(&[PROBE_TAG]), mac)
    }
}
