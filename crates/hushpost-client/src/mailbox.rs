//! Stored email operations
//!
//! Incoming envelopes are gated (friend-to-friend, kind marker, content
//! shape), deduplicated by a keyed lookup of the envelope hash, and stored
//! with every field encrypted. Listing runs newest first and skips
//! tombstones; deletion clears a row's payload but keeps its lookup, so a
//! deleted email cannot be pulled back in.

use chrono::Utc;
use tracing::debug;

use hushpost_crypto::PublicKey;
use hushpost_proto::{Envelope, EMAIL_KIND};

use crate::error::{ClientError, Result};
use crate::records::{email_hash_key, email_scan_prefix, email_seq_key, EmailRecord};
use crate::vault::{Vault, VaultSession, NAME_MAX, NAME_MIN};

/// One decrypted email, materialized from the vault on demand
#[derive(Clone, Debug)]
pub struct StoredEmail {
    /// 0-based position in the newest-first listing
    pub position: u64,
    /// Keyed envelope-hash lookup; the handle for deletion
    pub hash_lookup: [u8; 32],
    /// Sender's public key
    pub sender_key: PublicKey,
    /// Sender's self-declared name
    pub sender_name: String,
    /// Subject line
    pub title: String,
    /// Message body
    pub body: String,
    /// Local arrival time
    pub received_at: String,
}

impl Vault {
    /// Gate, deduplicate, and store one incoming envelope
    pub fn set_email(&self, session: &VaultSession, envelope: &Envelope) -> Result<()> {
        let sender = envelope
            .sender_public()
            .map_err(|_| ClientError::MalformedContent("sender key".to_string()))?;

        if self.f2f_enabled(session)? && !self.is_contact(session, &sender)? {
            return Err(ClientError::SenderNotInContacts);
        }

        if envelope.kind != EMAIL_KIND {
            return Err(ClientError::MalformedContent(format!(
                "kind {:?} is not an email",
                envelope.kind
            )));
        }

        let content = envelope
            .open(&session.keypair)
            .ok_or(ClientError::NotAddressedToOwner)?;

        let sender_name = content.sender_name.trim();
        if sender_name.len() < NAME_MIN || sender_name.len() > NAME_MAX {
            return Err(ClientError::MalformedContent(format!(
                "sender name must be {} to {} bytes",
                NAME_MIN, NAME_MAX
            )));
        }
        let title = content.title.trim();
        let body = content.body.trim();
        if title.is_empty() || body.is_empty() {
            return Err(ClientError::MalformedContent(
                "empty title or body".to_string(),
            ));
        }

        let hash_lookup = session.lookup(&envelope.content_hash);
        let _guard = self.write_lock.lock();

        let index_key = email_hash_key(session.user_id, &hash_lookup);
        if self.emails.contains_key(&index_key)? {
            return Err(ClientError::Duplicate);
        }

        let record = EmailRecord {
            hash_lookup,
            sender_key_ct: session.seal_field(&envelope.sender)?,
            sender_name_ct: session.seal_field(sender_name.as_bytes())?,
            title_ct: session.seal_field(title.as_bytes())?,
            body_ct: session.seal_field(body.as_bytes())?,
            time_ct: session.seal_field(Utc::now().to_rfc2822().as_bytes())?,
            deleted: false,
        };

        let seq = self.db.generate_id()?;
        self.emails.insert(
            email_seq_key(session.user_id, seq),
            bincode::serialize(&record)?,
        )?;
        self.emails.insert(index_key, seq.to_be_bytes().to_vec())?;

        debug!(
            "Stored email {} for {}",
            hex::encode(&hash_lookup[..8]),
            session.fingerprint
        );
        Ok(())
    }

    /// A page of the newest-first listing; tombstones do not count
    pub fn get_emails(
        &self,
        session: &VaultSession,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<StoredEmail>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }

        let mut live = 0u64;
        for item in self
            .emails
            .scan_prefix(email_scan_prefix(session.user_id))
            .rev()
        {
            let (_, raw) = item?;
            let record: EmailRecord = bincode::deserialize(&raw)?;
            if record.deleted {
                continue;
            }

            let position = live;
            live += 1;
            if position < offset {
                continue;
            }

            if let Some(email) = Self::open_email(session, position, &record) {
                out.push(email);
            }
            if out.len() as u64 == limit {
                break;
            }
        }
        Ok(out)
    }

    /// One email by listing position; 0 is the newest
    pub fn get_email(&self, session: &VaultSession, position: u64) -> Result<Option<StoredEmail>> {
        Ok(self.get_emails(session, position, 1)?.pop())
    }

    /// Tombstone an email; its dedup lookup stays behind
    pub fn del_email(&self, session: &VaultSession, hash_lookup: &[u8; 32]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let index_key = email_hash_key(session.user_id, hash_lookup);
        let seq_raw = match self.emails.get(&index_key)? {
            Some(raw) => raw,
            None => return Ok(()),
        };
        let seq = u64::from_be_bytes(
            seq_raw
                .as_ref()
                .try_into()
                .map_err(|_| ClientError::Storage("corrupt email index".to_string()))?,
        );

        let seq_key = email_seq_key(session.user_id, seq);
        if let Some(raw) = self.emails.get(&seq_key)? {
            let mut record: EmailRecord = bincode::deserialize(&raw)?;
            record.deleted = true;
            record.sender_key_ct.clear();
            record.sender_name_ct.clear();
            record.title_ct.clear();
            record.body_ct.clear();
            record.time_ct.clear();
            self.emails.insert(seq_key, bincode::serialize(&record)?)?;
        }

        debug!(
            "Deleted email {} for {}",
            hex::encode(&hash_lookup[..8]),
            session.fingerprint
        );
        Ok(())
    }

    fn open_email(
        session: &VaultSession,
        position: u64,
        record: &EmailRecord,
    ) -> Option<StoredEmail> {
        let key_bytes: [u8; 32] = session
            .open_field(&record.sender_key_ct)?
            .try_into()
            .ok()?;

        Some(StoredEmail {
            position,
            hash_lookup: record.hash_lookup,
            sender_key: PublicKey::from_bytes(&key_bytes).ok()?,
            sender_name: session.open_string(&record.sender_name_ct)?,
            title: session.open_string(&record.title_ct)?,
            body: session.open_string(&record.body_ct)?,
            received_at: session.open_string(&record.time_ct)?,
        })
    }
}
