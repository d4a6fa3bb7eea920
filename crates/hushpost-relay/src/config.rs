//! Relay configuration
//!
//! Strongly typed, resolved once at startup. A relay with `auth_secret` set
//! runs in trusted-federation mode and requires a valid MAC on every inbound
//! envelope; without it the relay is open and ignores MACs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Default envelope/body size bound (8 MiB)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8 * 1024 * 1024;

/// Default proof-of-work difficulty in leading zero bits
pub const DEFAULT_POW_DIFFICULTY: u8 = 20;

/// Default retention window (24 hours)
pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Default sweep interval (6 hours)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Relay node configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listen address (host:port)
    pub listen_addr: String,
    /// Maximum request body / envelope size in bytes
    pub max_request_bytes: usize,
    /// Proof-of-work difficulty; 0 disables the check
    pub pow_difficulty: u8,
    /// How long envelopes are held before the sweeper removes them
    pub retention_secs: u64,
    /// How often the sweeper runs
    pub sweep_interval_secs: u64,
    /// Inbound federation secret; Some = trusted-federation mode
    pub auth_secret: Option<String>,
    /// Peer relays to forward accepted envelopes to
    pub peers: Vec<PeerEntry>,
    /// Fan-out pool settings
    pub fanout: FanoutConfig,
    /// Storage settings
    pub storage: StorageConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            pow_difficulty: DEFAULT_POW_DIFFICULTY,
            retention_secs: DEFAULT_RETENTION_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            auth_secret: None,
            peers: Vec::new(),
            fanout: FanoutConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| RelayError::Config(format!("parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and peer entries
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            return Err(RelayError::Config("listen_addr must not be empty".to_string()));
        }
        if self.max_request_bytes == 0 {
            return Err(RelayError::Config("max_request_bytes must be > 0".to_string()));
        }
        if self.pow_difficulty > 32 {
            return Err(RelayError::Config(
                "pow_difficulty above 32 bits is not serviceable".to_string(),
            ));
        }
        if self.retention_secs == 0 {
            return Err(RelayError::Config("retention_secs must be > 0".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(RelayError::Config("sweep_interval_secs must be > 0".to_string()));
        }
        if self.fanout.max_concurrent == 0 {
            return Err(RelayError::Config("fanout.max_concurrent must be > 0".to_string()));
        }
        for peer in &self.peers {
            if peer.address.is_empty() {
                return Err(RelayError::Config("peer address must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Whether inbound envelopes must carry a valid federation MAC
    pub fn requires_mac(&self) -> bool {
        self.auth_secret.is_some()
    }
}

/// A peer relay this node forwards to
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Peer address (host:port)
    pub address: String,
    /// Shared secret for that peering, if it expects MACs
    #[serde(default)]
    pub secret: Option<String>,
}

/// Fan-out pool settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// Maximum concurrent outbound forwards
    pub max_concurrent: usize,
    /// Per-forward request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            request_timeout_secs: 10,
        }
    }
}

impl FanoutConfig {
    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Storage settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Sled database path; None keeps the mailbox in memory
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.requires_mac());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: RelayConfig =
            serde_json::from_str(r#"{"listen_addr": "0.0.0.0:9000", "pow_difficulty": 12}"#)
                .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.pow_difficulty, 12);
        assert_eq!(config.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
        assert_eq!(config.retention_secs, DEFAULT_RETENTION_SECS);
    }

    #[test]
    fn test_peers_parse() {
        let config: RelayConfig = serde_json::from_str(
            r#"{
                "auth_secret": "ours",
                "peers": [
                    {"address": "relay-b:8080", "secret": "theirs"},
                    {"address": "relay-c:8080"}
                ]
            }"#,
        )
        .unwrap();

        assert!(config.requires_mac());
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peers[0].secret.as_deref(), Some("theirs"));
        assert!(config.peers[1].secret.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = RelayConfig::default();
        config.pow_difficulty = 40;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.max_request_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.peers.push(PeerEntry {
            address: String::new(),
            secret: None,
        });
        assert!(config.validate().is_err());
    }
}
