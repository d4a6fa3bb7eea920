//! # Hushpost Protocol
//!
//! The wire-level pieces every hushpost node agrees on:
//!
//! - [`envelope`]: the sealed, signed, work-priced message unit
//! - [`pow`]: hash proof-of-work for admission pricing
//! - [`mac`]: shared-secret MACs between federated relays
//! - [`wire`]: HTTP request/response bodies and return codes

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod envelope;
pub mod error;
pub mod mac;
pub mod pow;
pub mod wire;

pub use envelope::{payload_hash, EmailContent, Envelope, EMAIL_KIND};
pub use error::{ProtoError, Result};
pub use mac::PeerMac;
pub use wire::{ApiResponse, ProbeRequest, RecvRequest, ReturnCode, SendRequest};
