//! Relay error types

use thiserror::Error;

use hushpost_proto::ReturnCode;

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay errors
///
/// Admission failures map onto wire return codes; everything stays
/// request-scoped and never takes the serving process down.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Envelope exceeds the relay's size bound
    #[error("Envelope too large: {size} bytes exceeds maximum {max}")]
    Oversized { size: usize, max: usize },

    /// Request body was not well-formed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Envelope did not decode or its content hash did not match
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Proof-of-work below the relay's difficulty
    #[error("Failed proof of work")]
    FailedProof,

    /// Federation MAC missing or wrong
    #[error("Failed MAC check")]
    FailedMac,

    /// No record at the requested ordinal
    #[error("No data at the requested ordinal")]
    NoData,

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// The wire return code for this failure
    pub fn return_code(&self) -> ReturnCode {
        match self {
            RelayError::Oversized { .. } => ReturnCode::Oversized,
            RelayError::MalformedRequest(_) => ReturnCode::MalformedRequest,
            RelayError::MalformedEnvelope(_) => ReturnCode::MalformedEnvelope,
            RelayError::FailedProof => ReturnCode::FailedProof,
            RelayError::FailedMac => ReturnCode::FailedMac,
            RelayError::NoData => ReturnCode::NoData,
            RelayError::Storage(_) => ReturnCode::StorageFailed,
            RelayError::Config(_) => ReturnCode::StorageFailed,
        }
    }
}
