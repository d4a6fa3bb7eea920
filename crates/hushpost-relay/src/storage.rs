//! Mailbox storage
//!
//! Envelopes are stored once, keyed globally by content hash, and indexed
//! per recipient in insertion order. Ordinals are 1-based positions in that
//! order and only shift when the sweeper removes expired records, so a
//! client paging through a mailbox between sweeps sees a stable view.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hushpost_crypto::Fingerprint;

use crate::error::{RelayError, Result};

/// One stored envelope
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MailboxRecord {
    /// Recipient mailbox
    pub recipient: Fingerprint,
    /// Content hash naming the envelope
    #[serde(with = "hex::serde")]
    pub envelope_hash: [u8; 32],
    /// Encoded envelope as received
    pub envelope: String,
    /// Arrival timestamp (Unix seconds)
    pub received_at: i64,
    /// Store-assigned insertion sequence
    pub seq: u64,
}

/// Mailbox storage trait
pub trait MailboxStore: Send + Sync {
    /// Store an envelope; false means the hash was already present
    fn insert(
        &self,
        recipient: &Fingerprint,
        envelope_hash: &[u8; 32],
        envelope: &str,
        received_at: i64,
    ) -> Result<bool>;

    /// Whether an envelope hash is present, for any recipient
    fn contains(&self, envelope_hash: &[u8; 32]) -> Result<bool>;

    /// Number of envelopes held for a recipient
    fn size(&self, recipient: &Fingerprint) -> Result<u64>;

    /// Envelope at a 1-based ordinal in insertion order; None = no such slot
    fn get_by_ordinal(&self, recipient: &Fingerprint, ordinal: u64) -> Result<Option<String>>;

    /// Remove every record older than the cutoff; returns how many
    fn remove_older_than(&self, cutoff: i64) -> Result<usize>;

    /// Flush to durable storage where applicable
    fn flush(&self) -> Result<()>;
}

/// In-memory mailbox store (tests, ephemeral relays)
pub struct MemoryMailbox {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    by_hash: HashMap<[u8; 32], MailboxRecord>,
    boxes: HashMap<Fingerprint, Vec<[u8; 32]>>,
    next_seq: u64,
}

impl MemoryMailbox {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
        }
    }
}

impl Default for MemoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxStore for MemoryMailbox {
    fn insert(
        &self,
        recipient: &Fingerprint,
        envelope_hash: &[u8; 32],
        envelope: &str,
        received_at: i64,
    ) -> Result<bool> {
        let mut inner = self.inner.write();

        if inner.by_hash.contains_key(envelope_hash) {
            return Ok(false);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.by_hash.insert(
            *envelope_hash,
            MailboxRecord {
                recipient: *recipient,
                envelope_hash: *envelope_hash,
                envelope: envelope.to_string(),
                received_at,
                seq,
            },
        );
        inner
            .boxes
            .entry(*recipient)
            .or_default()
            .push(*envelope_hash);

        debug!("Stored envelope {} for {}", hex::encode(&envelope_hash[..8]), recipient);
        Ok(true)
    }

    fn contains(&self, envelope_hash: &[u8; 32]) -> Result<bool> {
        Ok(self.inner.read().by_hash.contains_key(envelope_hash))
    }

    fn size(&self, recipient: &Fingerprint) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .boxes
            .get(recipient)
            .map(|hashes| hashes.len() as u64)
            .unwrap_or(0))
    }

    fn get_by_ordinal(&self, recipient: &Fingerprint, ordinal: u64) -> Result<Option<String>> {
        if ordinal == 0 {
            return Ok(None);
        }

        let inner = self.inner.read();
        let hash = match inner
            .boxes
            .get(recipient)
            .and_then(|hashes| hashes.get((ordinal - 1) as usize))
        {
            Some(hash) => hash,
            None => return Ok(None),
        };

        Ok(inner.by_hash.get(hash).map(|record| record.envelope.clone()))
    }

    fn remove_older_than(&self, cutoff: i64) -> Result<usize> {
        let mut inner = self.inner.write();

        let before = inner.by_hash.len();
        inner.by_hash.retain(|_, record| record.received_at >= cutoff);
        let removed = before - inner.by_hash.len();

        if removed > 0 {
            let by_hash = std::mem::take(&mut inner.by_hash);
            for hashes in inner.boxes.values_mut() {
                hashes.retain(|hash| by_hash.contains_key(hash));
            }
            inner.boxes.retain(|_, hashes| !hashes.is_empty());
            inner.by_hash = by_hash;
            info!("Swept {} expired envelopes", removed);
        }

        Ok(removed)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Sled-backed persistent mailbox store
///
/// Keys: `env:<hash-hex>` holds the record, `box:<fingerprint-hex>:<seq-be>`
/// indexes a recipient's envelopes in insertion order. Sequence numbers come
/// from sled's monotonic ID generator, and big-endian encoding keeps the
/// index iteration ordered.
pub struct SledMailbox {
    db: sled::Db,
}

impl SledMailbox {
    /// Open or create storage at path
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let db = sled::open(path).map_err(|e| RelayError::Storage(e.to_string()))?;
        Ok(Self { db })
    }

    /// Open a throwaway store backed by a temp file (tests)
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| RelayError::Storage(e.to_string()))?;
        Ok(Self { db })
    }

    fn record_key(envelope_hash: &[u8; 32]) -> Vec<u8> {
        format!("env:{}", hex::encode(envelope_hash)).into_bytes()
    }

    fn index_prefix(recipient: &Fingerprint) -> Vec<u8> {
        format!("box:{}:", recipient.to_hex()).into_bytes()
    }

    fn index_key(recipient: &Fingerprint, seq: u64) -> Vec<u8> {
        let mut key = Self::index_prefix(recipient);
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    fn load_record(&self, envelope_hash: &[u8; 32]) -> Result<Option<MailboxRecord>> {
        match self
            .db
            .get(Self::record_key(envelope_hash))
            .map_err(|e| RelayError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let record: MailboxRecord = bincode::deserialize(&bytes)
                    .map_err(|e| RelayError::Storage(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

impl MailboxStore for SledMailbox {
    fn insert(
        &self,
        recipient: &Fingerprint,
        envelope_hash: &[u8; 32],
        envelope: &str,
        received_at: i64,
    ) -> Result<bool> {
        if self.contains(envelope_hash)? {
            return Ok(false);
        }

        let seq = self
            .db
            .generate_id()
            .map_err(|e| RelayError::Storage(e.to_string()))?;

        let record = MailboxRecord {
            recipient: *recipient,
            envelope_hash: *envelope_hash,
            envelope: envelope.to_string(),
            received_at,
            seq,
        };
        let record_bytes =
            bincode::serialize(&record).map_err(|e| RelayError::Storage(e.to_string()))?;

        self.db
            .insert(Self::record_key(envelope_hash), record_bytes)
            .map_err(|e| RelayError::Storage(e.to_string()))?;
        self.db
            .insert(Self::index_key(recipient, seq), envelope_hash.to_vec())
            .map_err(|e| RelayError::Storage(e.to_string()))?;
        self.flush()?;

        debug!("Stored envelope {} for {}", hex::encode(&envelope_hash[..8]), recipient);
        Ok(true)
    }

    fn contains(&self, envelope_hash: &[u8; 32]) -> Result<bool> {
        self.db
            .contains_key(Self::record_key(envelope_hash))
            .map_err(|e| RelayError::Storage(e.to_string()))
    }

    fn size(&self, recipient: &Fingerprint) -> Result<u64> {
        let mut count = 0u64;
        for item in self.db.scan_prefix(Self::index_prefix(recipient)) {
            item.map_err(|e| RelayError::Storage(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    fn get_by_ordinal(&self, recipient: &Fingerprint, ordinal: u64) -> Result<Option<String>> {
        if ordinal == 0 {
            return Ok(None);
        }

        let mut seen = 0u64;
        for item in self.db.scan_prefix(Self::index_prefix(recipient)) {
            let (_, hash_bytes) = item.map_err(|e| RelayError::Storage(e.to_string()))?;
            seen += 1;
            if seen < ordinal {
                continue;
            }

            let hash: [u8; 32] = hash_bytes
                .as_ref()
                .try_into()
                .map_err(|_| RelayError::Storage("corrupt index entry".to_string()))?;
            return Ok(self.load_record(&hash)?.map(|record| record.envelope));
        }

        Ok(None)
    }

    fn remove_older_than(&self, cutoff: i64) -> Result<usize> {
        let mut expired = Vec::new();
        for item in self.db.scan_prefix(b"env:") {
            let (_, bytes) = item.map_err(|e| RelayError::Storage(e.to_string()))?;
            let record: MailboxRecord =
                bincode::deserialize(&bytes).map_err(|e| RelayError::Storage(e.to_string()))?;
            if record.received_at < cutoff {
                expired.push(record);
            }
        }

        let removed = expired.len();
        for record in expired {
            self.db
                .remove(Self::record_key(&record.envelope_hash))
                .map_err(|e| RelayError::Storage(e.to_string()))?;
            self.db
                .remove(Self::index_key(&record.recipient, record.seq))
                .map_err(|e| RelayError::Storage(e.to_string()))?;
        }

        if removed > 0 {
            self.flush()?;
            info!("Swept {} expired envelopes", removed);
        }

        Ok(removed)
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| RelayError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushpost_crypto::digest;

    fn fp(tag: &[u8]) -> Fingerprint {
        Fingerprint::from_bytes(digest(&[tag]))
    }

    fn exercise_ordering(store: &dyn MailboxStore) {
        let alice = fp(b"alice");
        let bob = fp(b"bob");

        assert!(store.insert(&alice, &digest(&[b"m1"]), "envelope-1", 100).unwrap());
        assert!(store.insert(&bob, &digest(&[b"m2"]), "envelope-2", 110).unwrap());
        assert!(store.insert(&alice, &digest(&[b"m3"]), "envelope-3", 120).unwrap());

        assert_eq!(store.size(&alice).unwrap(), 2);
        assert_eq!(store.size(&bob).unwrap(), 1);

        // 1-based, insertion order, per recipient
        assert_eq!(store.get_by_ordinal(&alice, 1).unwrap().unwrap(), "envelope-1");
        assert_eq!(store.get_by_ordinal(&alice, 2).unwrap().unwrap(), "envelope-3");
        assert_eq!(store.get_by_ordinal(&bob, 1).unwrap().unwrap(), "envelope-2");

        // out-of-range ordinals are absent, not errors
        assert!(store.get_by_ordinal(&alice, 0).unwrap().is_none());
        assert!(store.get_by_ordinal(&alice, 3).unwrap().is_none());
        assert!(store.get_by_ordinal(&fp(b"nobody"), 1).unwrap().is_none());
    }

    fn exercise_dedup(store: &dyn MailboxStore) {
        let alice = fp(b"alice");
        let bob = fp(b"bob");
        let hash = digest(&[b"the one envelope"]);

        assert!(store.insert(&alice, &hash, "envelope", 100).unwrap());
        // dedup is global, even across recipients
        assert!(!store.insert(&alice, &hash, "envelope", 101).unwrap());
        assert!(!store.insert(&bob, &hash, "envelope", 102).unwrap());

        assert!(store.contains(&hash).unwrap());
        assert_eq!(store.size(&alice).unwrap(), 1);
        assert_eq!(store.size(&bob).unwrap(), 0);
    }

    fn exercise_expiry(store: &dyn MailboxStore) {
        let alice = fp(b"alice");

        store.insert(&alice, &digest(&[b"old-1"]), "old-1", 100).unwrap();
        store.insert(&alice, &digest(&[b"old-2"]), "old-2", 150).unwrap();
        store.insert(&alice, &digest(&[b"new-1"]), "new-1", 500).unwrap();

        assert_eq!(store.remove_older_than(200).unwrap(), 2);
        assert_eq!(store.size(&alice).unwrap(), 1);

        // the survivor moves down to ordinal 1
        assert_eq!(store.get_by_ordinal(&alice, 1).unwrap().unwrap(), "new-1");
        assert!(store.get_by_ordinal(&alice, 2).unwrap().is_none());
        assert!(!store.contains(&digest(&[b"old-1"])).unwrap());

        // nothing left to sweep
        assert_eq!(store.remove_older_than(200).unwrap(), 0);
    }

    #[test]
    fn test_memory_ordering() {
        exercise_ordering(&MemoryMailbox::new());
    }

    #[test]
    fn test_memory_dedup() {
        exercise_dedup(&MemoryMailbox::new());
    }

    #[test]
    fn test_memory_expiry() {
        exercise_expiry(&MemoryMailbox::new());
    }

    #[test]
    fn test_sled_ordering() {
        exercise_ordering(&SledMailbox::temporary().unwrap());
    }

    #[test]
    fn test_sled_dedup() {
        exercise_dedup(&SledMailbox::temporary().unwrap());
    }

    #[test]
    fn test_sled_expiry() {
        exercise_expiry(&SledMailbox::temporary().unwrap());
    }
}
