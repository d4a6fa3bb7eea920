//! # Hushpost Client
//!
//! The user side of hushpost mail: a password-locked vault for accounts,
//! contacts, emails, and relay connections, plus the synchronization client
//! that pulls from and pushes to configured relays.
//!
//! - [`vault`]: accounts and the encrypted store
//! - [`mailbox`]: stored email operations
//! - [`contacts`]: contact list and relay connections
//! - [`sync`]: relay pull/push/probe

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod records;

pub mod contacts;
pub mod error;
pub mod mailbox;
pub mod sync;
pub mod vault;

pub use contacts::Connection;
pub use error::{ClientError, Result};
pub use mailbox::StoredEmail;
pub use sync::{PullReport, PushReport, SyncClient, SyncOptions};
pub use vault::{Vault, VaultOptions, VaultSession};
