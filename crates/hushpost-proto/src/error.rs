//! Protocol error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Serialization failed
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Deserialization failed
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Underlying crypto failure
    #[error("Crypto failure: {0}")]
    Crypto(#[from] hushpost_crypto::CryptoError),
}
