//! # Hushpost Cryptographic Library
//!
//! Core cryptographic primitives for the hushpost hidden mail network.
//!
//! ## Core Components
//!
//! - [`keys`]: Ed25519 owner keys with derived X25519 exchange keys
//! - [`sealed`]: anonymous sealed boxes for envelope payloads
//! - [`cipher`]: symmetric encryption for vault fields and federation MACs
//! - [`kdf`]: password strengthening by iterated hashing
//! - [`hash`]: digests and mailbox fingerprints

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod cipher;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod sealed;

pub use cipher::SecretCipher;
pub use error::{CryptoError, Result};
pub use hash::{constant_time_eq, digest, random_bytes, Fingerprint};
pub use kdf::{strengthen, verifier};
pub use keys::{Keypair, PublicKey, SharedSecret};
pub use sealed::{open_box, seal_box, SealedPayload};
