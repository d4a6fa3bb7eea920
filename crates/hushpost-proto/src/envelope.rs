//! Sealed envelopes
//!
//! An envelope is the unit a relay stores and forwards. In the clear it
//! carries only the sender's public key, a message-class marker, and the
//! admission fields (content hash, signature, proof-of-work nonce). The
//! subject line, body, and sender's display name ride inside the sealed
//! payload; both clear fields are bound into the seal as associated data, so
//! they cannot be swapped after the fact. Envelopes are immutable once made.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use hushpost_crypto::{digest, open_box, seal_box, Keypair, PublicKey, SealedPayload};

use crate::error::{ProtoError, Result};
use crate::pow;

/// Message-class marker for mail envelopes
pub const EMAIL_KIND: &str = "hushpost/v1: email";

/// Plaintext content of a mail envelope, JSON inside the sealed payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    /// Sender's self-declared display name
    pub sender_name: String,
    /// Subject line
    pub title: String,
    /// Message body
    pub body: String,
}

/// A sealed, signed, work-priced message envelope
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender's Ed25519 public key
    #[serde(with = "hex::serde")]
    pub sender: [u8; 32],
    /// Message-class marker, in the clear
    pub kind: String,
    /// Sealed content
    pub payload: SealedPayload,
    /// SHA-256 over the sealed payload parts
    #[serde(with = "hex::serde")]
    pub content_hash: [u8; 32],
    /// Sender's signature over the content hash
    #[serde(with = "hex::serde")]
    pub signature: [u8; 64],
    /// Proof-of-work nonce for the content hash
    pub pow_nonce: u64,
}

/// Hash that names an envelope: SHA-256 over the sealed payload parts
pub fn payload_hash(payload: &SealedPayload) -> [u8; 32] {
    digest(&[&payload.ephemeral, &payload.nonce, &payload.ciphertext])
}

/// Associated data binding the clear fields into the seal
fn seal_aad(sender: &[u8; 32], kind: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(32 + kind.len());
    aad.extend_from_slice(sender);
    aad.extend_from_slice(kind.as_bytes());
    aad
}

impl Envelope {
    /// Seal a mail envelope toward a recipient
    ///
    /// Solves the proof-of-work at the given difficulty before returning, so
    /// every envelope that exists has already paid for admission.
    pub fn seal(
        sender: &Keypair,
        sender_name: &str,
        recipient: &PublicKey,
        title: &str,
        body: &str,
        difficulty: u8,
    ) -> Result<Self> {
        let content = EmailContent {
            sender_name: sender_name.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        };
        let plaintext =
            serde_json::to_vec(&content).map_err(|e| ProtoError::Encode(e.to_string()))?;

        let sender_bytes = sender.public().to_bytes();
        let aad = seal_aad(&sender_bytes, EMAIL_KIND);
        let payload = seal_box(recipient, &plaintext, &aad)?;

        let content_hash = payload_hash(&payload);
        let signature = sender.sign(&content_hash);
        let pow_nonce = pow::solve(&content_hash, difficulty);

        Ok(Self {
            sender: sender_bytes,
            kind: EMAIL_KIND.to_string(),
            payload,
            content_hash,
            signature,
            pow_nonce,
        })
    }

    /// Check that the declared content hash matches the sealed payload
    pub fn verify_content_hash(&self) -> bool {
        payload_hash(&self.payload) == self.content_hash
    }

    /// Sender's public key, if the clear bytes are a valid key
    pub fn sender_public(&self) -> Result<PublicKey> {
        Ok(PublicKey::from_bytes(&self.sender)?)
    }

    /// Open the envelope with the recipient's key
    ///
    /// Recomputes the content hash, checks the sender's signature, then
    /// unseals. Any failure collapses to None: an envelope that is not for
    /// this key looks exactly like a corrupted one.
    pub fn open(&self, recipient: &Keypair) -> Option<EmailContent> {
        if !self.verify_content_hash() {
            return None;
        }

        let sender = self.sender_public().ok()?;
        sender.verify(&self.content_hash, &self.signature).ok()?;

        let aad = seal_aad(&self.sender, &self.kind);
        let plaintext = open_box(recipient, &self.payload, &aad)?;
        serde_json::from_slice(&plaintext).ok()
    }

    /// Encode for the wire: base64 over the binary form
    pub fn encode(&self) -> Result<String> {
        let bytes = bincode::serialize(self).map_err(|e| ProtoError::Encode(e.to_string()))?;
        Ok(BASE64.encode(bytes))
    }

    /// Decode from the wire form
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| ProtoError::Decode(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| ProtoError::Decode(e.to_string()))
    }
}
