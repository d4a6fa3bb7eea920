//! Relay admission pipeline
//!
//! Cheapest checks first: size bound, decode, content hash, proof-of-work,
//! then the federation MAC when this relay requires one, and only then the
//! write. A single mutex serializes writes so the dedup check and the insert
//! are one atomic step; reads go straight to the store.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use hushpost_crypto::Fingerprint;
use hushpost_proto::{pow, Envelope, PeerMac};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::fanout::FanoutPool;
use crate::storage::MailboxStore;

/// What happened to an accepted envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Newly stored and offered to peers
    Stored,
    /// Hash already known; nothing stored, nothing forwarded
    Duplicate,
}

/// One relay node's request-handling core
pub struct RelayService {
    config: RelayConfig,
    store: Arc<dyn MailboxStore>,
    fanout: Option<FanoutPool>,
    write_lock: Mutex<()>,
}

impl RelayService {
    /// Build the service; a fan-out pool exists only when peers are configured
    pub fn new(config: RelayConfig, store: Arc<dyn MailboxStore>) -> Result<Self> {
        let fanout = if config.peers.is_empty() {
            None
        } else {
            Some(FanoutPool::new(config.peers.clone(), &config.fanout)?)
        };

        Ok(Self {
            config,
            store,
            fanout,
            write_lock: Mutex::new(()),
        })
    }

    /// The resolved configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The underlying store (shared with the sweeper)
    pub fn store(&self) -> Arc<dyn MailboxStore> {
        Arc::clone(&self.store)
    }

    /// Run an inbound envelope through the admission pipeline
    pub fn accept(
        &self,
        recipient: &Fingerprint,
        envelope_str: &str,
        mac: Option<&str>,
    ) -> Result<AcceptOutcome> {
        if envelope_str.len() > self.config.max_request_bytes {
            return Err(RelayError::Oversized {
                size: envelope_str.len(),
                max: self.config.max_request_bytes,
            });
        }

        let envelope = Envelope::decode(envelope_str)
            .map_err(|e| RelayError::MalformedEnvelope(e.to_string()))?;
        if !envelope.verify_content_hash() {
            return Err(RelayError::MalformedEnvelope(
                "content hash mismatch".to_string(),
            ));
        }

        if !pow::verify(
            &envelope.content_hash,
            self.config.pow_difficulty,
            envelope.pow_nonce,
        ) {
            return Err(RelayError::FailedProof);
        }

        if let Some(secret) = &self.config.auth_secret {
            let verified = match mac {
                Some(mac) => PeerMac::verify(secret, &envelope.content_hash, mac),
                None => false,
            };
            if !verified {
                return Err(RelayError::FailedMac);
            }
        }

        let received_at = chrono::Utc::now().timestamp();
        let newly_stored = {
            let _guard = self.write_lock.lock();
            self.store
                .insert(recipient, &envelope.content_hash, envelope_str, received_at)?
        };

        if !newly_stored {
            debug!(
                "Envelope {} already held, skipping",
                hex::encode(&envelope.content_hash[..8])
            );
            return Ok(AcceptOutcome::Duplicate);
        }

        info!(
            "Accepted envelope {} for {}",
            hex::encode(&envelope.content_hash[..8]),
            recipient
        );

        if let Some(fanout) = &self.fanout {
            fanout.submit(recipient, envelope_str, &envelope.content_hash);
        }

        Ok(AcceptOutcome::Stored)
    }

    /// Mailbox size for a recipient
    pub fn size(&self, recipient: &Fingerprint) -> Result<u64> {
        self.store.size(recipient)
    }

    /// Envelope at a 1-based ordinal; None = nothing there
    pub fn fetch(&self, recipient: &Fingerprint, ordinal: u64) -> Result<Option<String>> {
        self.store.get_by_ordinal(recipient, ordinal)
    }

    /// Check a connection probe
    ///
    /// An open relay accepts any probe; a trusted-federation relay verifies
    /// the MAC against its inbound secret.
    pub fn probe(&self, mac: &str) -> bool {
        match &self.config.auth_secret {
            Some(secret) => PeerMac::verify_probe(secret, mac),
            None => true,
        }
    }
}
