//! Relay synchronization
//!
//! Pull walks every configured relay concurrently: mailbox size first, then
//! ordinals one by one. A transport failure ends that relay's pass, a
//! refused ordinal is skipped, and an envelope that does not open for this
//! user is dropped without a trace. At most `max_new_per_relay` new emails
//! are stored per relay per pass. Push seals once and submits the same
//! envelope to every configured relay, with a MAC where the connection
//! carries a shared secret. Per-relay outcomes land in report structs; only
//! local failures raise errors.

use std::time::Duration;

use tracing::{debug, warn};

use hushpost_crypto::{Fingerprint, PublicKey};
use hushpost_proto::{
    ApiResponse, Envelope, PeerMac, ProbeRequest, RecvRequest, ReturnCode, SendRequest,
};

use crate::contacts::Connection;
use crate::error::Result;
use crate::vault::{Vault, VaultSession};

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
/// Default cap on newly stored emails per relay per pass
pub const DEFAULT_MAX_NEW_PER_RELAY: usize = 5;

/// Synchronization settings
#[derive(Clone, Copy, Debug)]
pub struct SyncOptions {
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Cap on newly stored emails per relay per pass
    pub max_new_per_relay: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_new_per_relay: DEFAULT_MAX_NEW_PER_RELAY,
        }
    }
}

/// Outcome of one relay's pull pass
#[derive(Clone, Debug)]
pub struct PullReport {
    /// Relay host
    pub host: String,
    /// Envelopes the relay handed over
    pub fetched: u64,
    /// Emails newly stored in the vault
    pub stored: u64,
    /// Transport failure that ended the pass, if any
    pub error: Option<String>,
}

/// Outcome of one relay's push submission
#[derive(Clone, Debug)]
pub struct PushReport {
    /// Relay host
    pub host: String,
    /// Whether the relay acknowledged the envelope
    pub accepted: bool,
    /// Transport failure or relay refusal, if any
    pub error: Option<String>,
}

/// HTTP client for talking to relays
pub struct SyncClient {
    http: reqwest::Client,
    max_new_per_relay: usize,
}

impl SyncClient {
    /// Build a client with the given settings
    pub fn new(options: SyncOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            max_new_per_relay: options.max_new_per_relay,
        })
    }

    /// Build a client with default settings
    pub fn with_defaults() -> Result<Self> {
        Self::new(SyncOptions::default())
    }

    fn endpoint(host: &str, path: &str) -> String {
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{}", host, path)
        } else {
            format!("http://{}{}", host, path)
        }
    }

    /// Check a relay's probe endpoint with a candidate federation secret
    pub async fn probe(&self, host: &str, secret: &str) -> Result<bool> {
        let request = ProbeRequest {
            mac: PeerMac::seal_probe(secret)?,
        };
        let response: ApiResponse = self
            .http
            .post(Self::endpoint(host, "/"))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response.is_ok())
    }

    /// Pull every configured relay once; one report per relay
    pub async fn pull(&self, vault: &Vault, session: &VaultSession) -> Result<Vec<PullReport>> {
        let connections = vault.connections(session)?;
        let passes = connections
            .into_iter()
            .map(|connection| self.pull_one(vault, session, connection));
        Ok(futures::future::join_all(passes).await)
    }

    async fn pull_one(
        &self,
        vault: &Vault,
        session: &VaultSession,
        connection: Connection,
    ) -> PullReport {
        let mut report = PullReport {
            host: connection.host.clone(),
            fetched: 0,
            stored: 0,
            error: None,
        };
        let recipient = session.fingerprint();

        let size = match self.recv(&connection.host, &recipient, 0).await {
            Ok(Some(text)) => match text.parse::<u64>() {
                Ok(size) => size,
                Err(_) => {
                    report.error = Some(format!("malformed size {:?}", text));
                    return report;
                }
            },
            Ok(None) => {
                report.error = Some("relay refused the size request".to_string());
                return report;
            }
            Err(err) => {
                report.error = Some(err.to_string());
                return report;
            }
        };

        for ordinal in 1..=size {
            let text = match self.recv(&connection.host, &recipient, ordinal).await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(err) => {
                    report.error = Some(err.to_string());
                    break;
                }
            };
            report.fetched += 1;

            let envelope = match Envelope::decode(&text) {
                Ok(envelope) => envelope,
                Err(err) => {
                    debug!("Dropping envelope at ordinal {}: {}", ordinal, err);
                    continue;
                }
            };
            match vault.set_email(session, &envelope) {
                Ok(()) => {
                    report.stored += 1;
                    if report.stored as usize >= self.max_new_per_relay {
                        break;
                    }
                }
                Err(err) => {
                    debug!("Skipping envelope at ordinal {}: {}", ordinal, err);
                }
            }
        }

        debug!(
            "Pulled {}: {} fetched, {} stored",
            report.host, report.fetched, report.stored
        );
        report
    }

    /// Seal one email and submit it to every configured relay
    pub async fn push(
        &self,
        vault: &Vault,
        session: &VaultSession,
        recipient: &PublicKey,
        title: &str,
        body: &str,
        difficulty: u8,
    ) -> Result<Vec<PushReport>> {
        let envelope = Envelope::seal(
            session.keypair(),
            session.name(),
            recipient,
            title,
            body,
            difficulty,
        )?;
        let encoded = envelope.encode()?;
        let mailbox = recipient.fingerprint();

        let connections = vault.connections(session)?;
        let submissions = connections.into_iter().map(|connection| {
            self.push_one(connection, mailbox, encoded.clone(), envelope.content_hash)
        });
        Ok(futures::future::join_all(submissions).await)
    }

    async fn push_one(
        &self,
        connection: Connection,
        mailbox: Fingerprint,
        encoded: String,
        content_hash: [u8; 32],
    ) -> PushReport {
        let mac = match connection.secret.as_deref() {
            Some(secret) => match PeerMac::seal(secret, &content_hash) {
                Ok(mac) => Some(mac),
                Err(err) => {
                    return PushReport {
                        host: connection.host,
                        accepted: false,
                        error: Some(err.to_string()),
                    };
                }
            },
            None => None,
        };
        let request = SendRequest {
            recipient: mailbox,
            envelope: encoded,
            mac,
        };

        match self.send(&connection.host, &request).await {
            Ok(code) if code == ReturnCode::Ok.as_i32() => PushReport {
                host: connection.host,
                accepted: true,
                error: None,
            },
            Ok(code) => {
                warn!("Relay {} declined the email with code {}", connection.host, code);
                PushReport {
                    host: connection.host,
                    accepted: false,
                    error: Some(format!("relay returned {}", code)),
                }
            }
            Err(err) => PushReport {
                host: connection.host,
                accepted: false,
                error: Some(err.to_string()),
            },
        }
    }

    async fn send(&self, host: &str, request: &SendRequest) -> Result<i32> {
        let response: ApiResponse = self
            .http
            .post(Self::endpoint(host, "/email/send"))
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response.code)
    }

    async fn recv(
        &self,
        host: &str,
        recipient: &Fingerprint,
        ordinal: u64,
    ) -> Result<Option<String>> {
        let request = RecvRequest {
            recipient: *recipient,
            ordinal,
        };
        let response: ApiResponse = self
            .http
            .post(Self::endpoint(host, "/email/recv"))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        if response.code == ReturnCode::Ok.as_i32() {
            Ok(Some(response.result))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_adds_scheme_when_missing() {
        assert_eq!(
            SyncClient::endpoint("relay-a:8080", "/email/send"),
            "http://relay-a:8080/email/send"
        );
        assert_eq!(
            SyncClient::endpoint("http://relay-a:8080", "/"),
            "http://relay-a:8080/"
        );
        assert_eq!(
            SyncClient::endpoint("https://relay-a", "/email/recv"),
            "https://relay-a/email/recv"
        );
    }

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert_eq!(options.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(options.max_new_per_relay, DEFAULT_MAX_NEW_PER_RELAY);
        assert!(SyncClient::new(options).is_ok());
    }
}
