//! # Hushpost Relay
//!
//! A store-and-forward relay node: accepts sealed envelopes priced by
//! proof-of-work, holds them per recipient fingerprint for a retention
//! window, serves them back by ordinal, and offers every newly accepted
//! envelope to its federation peers.
//!
//! - [`service`]: the admission pipeline
//! - [`storage`]: mailbox stores (memory and sled)
//! - [`fanout`]: bounded fire-and-forget peer forwarding
//! - [`sweep`]: the retention sweeper
//! - [`http`]: the actix-web surface
//! - [`config`]: relay configuration

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod fanout;
pub mod http;
pub mod service;
pub mod storage;
pub mod sweep;

pub use config::{FanoutConfig, PeerEntry, RelayConfig, StorageConfig};
pub use error::{RelayError, Result};
pub use fanout::FanoutPool;
pub use http::{configure, json_config, AppState};
pub use service::{AcceptOutcome, RelayService};
pub use storage::{MailboxRecord, MailboxStore, MemoryMailbox, SledMailbox};
pub use sweep::Sweeper;
