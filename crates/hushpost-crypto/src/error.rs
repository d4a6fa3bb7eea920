//! Crypto error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Crypto errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid public key material
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid secret key material
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Signature did not verify
    #[error("Invalid signature")]
    InvalidSignature,

    /// Fingerprint string could not be parsed
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Key derivation failed
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}
