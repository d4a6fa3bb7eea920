//! HTTP wire types
//!
//! Every relay response is HTTP 200 with a `{result, return}` body; the
//! numeric return code is the protocol-level verdict. Transport status codes
//! carry no meaning beyond "the relay answered".

use serde::{Deserialize, Serialize};

use hushpost_crypto::Fingerprint;

/// Protocol return codes, fixed on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ReturnCode {
    /// Request handled
    Ok = 0,
    /// Route exists, method does not
    BadMethod = 1,
    /// Body exceeded the relay's size bound
    Oversized = 2,
    /// Body was not a well-formed request
    MalformedRequest = 3,
    /// Envelope string did not decode or its hash did not match
    MalformedEnvelope = 4,
    /// Proof-of-work below the relay's difficulty
    FailedProof = 5,
    /// Federation MAC missing or wrong
    FailedMac = 6,
    /// The relay could not persist the envelope
    StorageFailed = 7,
    /// No record at the requested ordinal
    NoData = 8,
}

impl ReturnCode {
    /// Wire representation
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Submit an envelope for a recipient
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient mailbox fingerprint
    pub recipient: Fingerprint,
    /// Encoded envelope
    pub envelope: String,
    /// Federation MAC, when the submitting side holds a shared secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

/// Fetch the mailbox size (ordinal 0) or one envelope (ordinal >= 1)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecvRequest {
    /// Recipient mailbox fingerprint
    pub recipient: Fingerprint,
    /// 1-based position in the mailbox; 0 asks for the size
    pub ordinal: u64,
}

/// Check a configured shared secret against a relay
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// MAC over the fixed probe tag
    pub mac: String,
}

/// Uniform response body
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Payload or human-readable verdict
    pub result: String,
    /// Protocol return code
    #[serde(rename = "return")]
    pub code: i32,
}

impl ApiResponse {
    /// Success with a payload string
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            code: ReturnCode::Ok.as_i32(),
        }
    }

    /// Failure with a verdict message
    pub fn error(code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            result: message.into(),
            code: code.as_i32(),
        }
    }

    /// Whether the protocol verdict is success
    pub fn is_ok(&self) -> bool {
        self.code == ReturnCode::Ok.as_i32()
    }
}
