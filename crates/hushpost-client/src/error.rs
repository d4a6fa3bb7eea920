//! Client error types

use thiserror::Error;

use hushpost_crypto::CryptoError;
use hushpost_proto::ProtoError;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
///
/// Vault operations fail per call; relay synchronization reports per-relay
/// failures in its result structs instead of raising them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// User or sender name outside the accepted shape
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Password shorter than the minimum
    #[error("Password must be at least 8 characters")]
    InvalidPassword,

    /// A user with this name already exists in the vault
    #[error("User already exists")]
    UserExists,

    /// A user with this key already exists in the vault
    #[error("A user with this key already exists")]
    FingerprintExists,

    /// Contact name or key already present for this user
    #[error("Contact already exists")]
    ContactExists,

    /// Relay host is empty
    #[error("Relay host must not be empty")]
    InvalidHost,

    /// Email with this envelope hash is already stored
    #[error("Email already stored")]
    Duplicate,

    /// Friend-to-friend mode is on and the sender is unknown
    #[error("Sender is not in the contact list")]
    SenderNotInContacts,

    /// Envelope did not open with this user's key
    #[error("Envelope is not addressed to this user")]
    NotAddressedToOwner,

    /// Envelope content failed validation
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Key or cipher failure
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Envelope encode/decode failure
    #[error("Protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<sled::Error> for ClientError {
    fn from(err: sled::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for ClientError {
    fn from(err: bincode::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}
