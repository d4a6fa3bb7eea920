//! Federation fan-out
//!
//! Every accepted envelope is offered once to every configured peer relay.
//! Forwards are fire-and-forget: a failed or declined forward is logged and
//! dropped, never retried or queued. A semaphore caps how many forwards are
//! in flight at once so a burst of accepts cannot pile up connections.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use hushpost_crypto::Fingerprint;
use hushpost_proto::{ApiResponse, PeerMac, SendRequest};

use crate::config::{FanoutConfig, PeerEntry};
use crate::error::{RelayError, Result};

/// Bounded fire-and-forget forwarder
pub struct FanoutPool {
    client: reqwest::Client,
    peers: Arc<Vec<PeerEntry>>,
    semaphore: Arc<Semaphore>,
}

impl FanoutPool {
    /// Build a pool over a fixed peer snapshot
    pub fn new(peers: Vec<PeerEntry>, config: &FanoutConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RelayError::Config(format!("fanout client: {}", e)))?;

        Ok(Self {
            client,
            peers: Arc::new(peers),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// Number of configured peers
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Build the forward request for one peer, MACed when the peering has a secret
    fn forward_request(
        peer: &PeerEntry,
        recipient: &Fingerprint,
        envelope: &str,
        content_hash: &[u8; 32],
    ) -> SendRequest {
        let mac = match &peer.secret {
            Some(secret) => match PeerMac::seal(secret, content_hash) {
                Ok(mac) => Some(mac),
                Err(e) => {
                    debug!("MAC for peer {} failed: {}", peer.address, e);
                    None
                }
            },
            None => None,
        };

        SendRequest {
            recipient: *recipient,
            envelope: envelope.to_string(),
            mac,
        }
    }

    /// Offer an envelope to every peer; returns immediately
    ///
    /// Must run inside a tokio runtime, which the relay's HTTP server
    /// provides for every admission.
    pub fn submit(&self, recipient: &Fingerprint, envelope: &str, content_hash: &[u8; 32]) {
        for peer in self.peers.iter() {
            let request = Self::forward_request(peer, recipient, envelope, content_hash);
            let address = peer.address.clone();
            let client = self.client.clone();
            let semaphore = Arc::clone(&self.semaphore);

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let url = format!("http://{}/email/send", address);
                match client.post(&url).json(&request).send().await {
                    Ok(response) => match response.json::<ApiResponse>().await {
                        Ok(body) if body.is_ok() => {
                            debug!("Forwarded envelope to {}", address);
                        }
                        Ok(body) => {
                            debug!("Peer {} declined forward: code {}", address, body.code);
                        }
                        Err(e) => {
                            debug!("Peer {} answered malformed body: {}", address, e);
                        }
                    },
                    Err(e) => {
                        debug!("Forward to {} failed: {}", address, e);
                    }
                }
            });
        }
    }
}
