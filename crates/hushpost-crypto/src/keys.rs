//! Identity keys for mailbox owners
//!
//! Each mailbox owner holds an Ed25519 signing key. The matching X25519
//! exchange key is derived from it (SHA-512 seed expansion plus clamping, the
//! libsodium `crypto_sign_ed25519_sk_to_curve25519` construction), so a
//! single 32-byte public key is enough to both verify signatures and seal
//! payloads to the owner.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::hash::{digest, Fingerprint};

/// Shared secret from a Diffie-Hellman exchange
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(pub [u8; 32]);

impl SharedSecret {
    /// Get the secret bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Owner key pair (Ed25519 for signing, derived X25519 for sealing)
#[derive(ZeroizeOnDrop)]
pub struct Keypair {
    /// The signing key
    #[zeroize(skip)]
    signing_key: SigningKey,
    /// The exchange key derived from the signing key
    exchange_secret: X25519StaticSecret,
}

impl Keypair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let exchange_secret = Self::derive_x25519_from_ed25519(&signing_key);

        Self {
            signing_key,
            exchange_secret,
        }
    }

    /// Create from existing secret bytes (32-byte Ed25519 seed)
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let exchange_secret = Self::derive_x25519_from_ed25519(&signing_key);

        Self {
            signing_key,
            exchange_secret,
        }
    }

    /// Derive the X25519 secret from the Ed25519 signing key
    fn derive_x25519_from_ed25519(signing_key: &SigningKey) -> X25519StaticSecret {
        use sha2::{Digest, Sha512};

        let mut hasher = Sha512::new();
        hasher.update(signing_key.to_bytes());
        let hash = hasher.finalize();

        let mut x25519_bytes = [0u8; 32];
        x25519_bytes.copy_from_slice(&hash[..32]);

        // Clamp (X25519 requirement)
        x25519_bytes[0] &= 248;
        x25519_bytes[31] &= 127;
        x25519_bytes[31] |= 64;

        X25519StaticSecret::from(x25519_bytes)
    }

    /// Get the public half
    pub fn public(&self) -> PublicKey {
        PublicKey {
            signing_key: self.signing_key.verifying_key(),
            exchange_key: X25519PublicKey::from(&self.exchange_secret),
        }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Perform a Diffie-Hellman exchange against an X25519 public key
    pub fn diffie_hellman(&self, their_public: &X25519PublicKey) -> SharedSecret {
        let shared = self.exchange_secret.diffie_hellman(their_public);
        SharedSecret(*shared.as_bytes())
    }

    /// Get the secret seed bytes (for encrypted storage)
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Fingerprint of the public half
    pub fn fingerprint(&self) -> Fingerprint {
        self.public().fingerprint()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(&self.signing_key.to_bytes())
    }
}

/// Public half of an owner key pair
#[derive(Clone, Debug)]
pub struct PublicKey {
    /// Ed25519 verifying key
    signing_key: VerifyingKey,
    /// X25519 public key for sealing
    exchange_key: X25519PublicKey,
}

impl PublicKey {
    /// Create from the 32-byte Ed25519 encoding
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey("invalid Ed25519 point".to_string()))?;
        let exchange_key = Self::ed25519_pk_to_x25519_pk(&signing_key)?;

        Ok(Self {
            signing_key,
            exchange_key,
        })
    }

    /// Convert an Ed25519 public key to its X25519 form
    fn ed25519_pk_to_x25519_pk(ed_pk: &VerifyingKey) -> Result<X25519PublicKey> {
        use curve25519_dalek::edwards::CompressedEdwardsY;
        use curve25519_dalek::montgomery::MontgomeryPoint;

        let compressed = CompressedEdwardsY::from_slice(ed_pk.as_bytes())
            .map_err(|_| CryptoError::InvalidPublicKey("invalid compressed point".to_string()))?;

        let edwards = compressed
            .decompress()
            .ok_or_else(|| CryptoError::InvalidPublicKey("point does not decompress".to_string()))?;

        let montgomery: MontgomeryPoint = edwards.to_montgomery();
        Ok(X25519PublicKey::from(montgomery.to_bytes()))
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let sig = Signature::from_bytes(signature);
        self.signing_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// The 32-byte Ed25519 encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// X25519 public key for sealing toward this owner
    pub fn exchange_key(&self) -> &X25519PublicKey {
        &self.exchange_key
    }

    /// Mailbox fingerprint: SHA-256 of the encoded public key
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_bytes(digest(&[&self.to_bytes()]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hold this until someone asks";

        let signature = keypair.sign(message);
        assert!(keypair.public().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_tampered_signature() {
        let keypair = Keypair::generate();
        let message = b"hold this until someone asks";

        let mut signature = keypair.sign(message);
        signature[0] ^= 0xFF;

        assert!(keypair.public().verify(message, &signature).is_err());
    }

    #[test]
    fn test_secret_bytes_roundtrip() {
        let keypair = Keypair::generate();
        let restored = Keypair::from_secret_bytes(&keypair.secret_bytes());

        assert_eq!(keypair.public(), restored.public());
        assert_eq!(keypair.fingerprint(), restored.fingerprint());
    }

    #[test]
    fn test_public_key_roundtrip() {
        let keypair = Keypair::generate();
        let public = keypair.public();

        let restored = PublicKey::from_bytes(&public.to_bytes()).unwrap();
        assert_eq!(public, restored);
        assert_eq!(public.fingerprint(), restored.fingerprint());
    }

    #[test]
    fn test_diffie_hellman_agreement() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        // Bob only knows Alice's Ed25519 encoding, as on the wire
        let alice_public = PublicKey::from_bytes(&alice.public().to_bytes()).unwrap();

        let alice_shared = alice.diffie_hellman(bob.public().exchange_key());
        let bob_shared = bob.diffie_hellman(alice_public.exchange_key());

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_fingerprints_differ() {
        let a = Keypair::generate();
        let b = Keypair::generate();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
