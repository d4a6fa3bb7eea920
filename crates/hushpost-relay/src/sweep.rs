//! Retention sweep
//!
//! A periodic task that removes envelopes older than the retention window.
//! The sweep is the only eviction the mailbox has; between sweeps the store
//! grows freely and ordinals are stable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::storage::MailboxStore;

/// Owned handle to the periodic sweep task
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop; the first pass runs immediately
    pub fn spawn(store: Arc<dyn MailboxStore>, retention_secs: u64, interval_secs: u64) -> Self {
        let (shutdown, mut rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let cutoff = chrono::Utc::now().timestamp() - retention_secs as i64;
                        match store.remove_older_than(cutoff) {
                            Ok(count) if count > 0 => {
                                info!("Sweep removed {} expired envelopes", count);
                            }
                            Err(e) => {
                                error!("Sweep failed: {}", e);
                            }
                            _ => {}
                        }
                    }
                    _ = rx.changed() => {
                        if *rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Sweeper stopped");
        });

        Self { shutdown, handle }
    }

    /// Stop the loop and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryMailbox;
    use hushpost_crypto::{digest, Fingerprint};

    async fn wait_until_empty(store: &Arc<dyn MailboxStore>, recipient: &Fingerprint) -> bool {
        for _ in 0..50 {
            if store.size(recipient).unwrap() == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired() {
        let store: Arc<dyn MailboxStore> = Arc::new(MemoryMailbox::new());
        let recipient = Fingerprint::from_bytes(digest(&[b"recipient"]));

        // already far beyond the retention window
        let stale = chrono::Utc::now().timestamp() - 1_000;
        store
            .insert(&recipient, &digest(&[b"old"]), "old-envelope", stale)
            .unwrap();

        let sweeper = Sweeper::spawn(Arc::clone(&store), 60, 3600);
        assert!(wait_until_empty(&store, &recipient).await);
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_keeps_fresh_records() {
        let store: Arc<dyn MailboxStore> = Arc::new(MemoryMailbox::new());
        let recipient = Fingerprint::from_bytes(digest(&[b"recipient"]));

        store
            .insert(
                &recipient,
                &digest(&[b"new"]),
                "new-envelope",
                chrono::Utc::now().timestamp(),
            )
            .unwrap();

        let sweeper = Sweeper::spawn(Arc::clone(&store), 3600, 3600);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.size(&recipient).unwrap(), 1);
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_resolves() {
        let store: Arc<dyn MailboxStore> = Arc::new(MemoryMailbox::new());
        let sweeper = Sweeper::spawn(store, 3600, 3600);
        sweeper.shutdown().await;
    }
}
