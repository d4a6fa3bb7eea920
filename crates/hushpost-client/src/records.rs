//! Vault record layout
//!
//! One sled tree per record family. Primary keys inside a tree are
//! disambiguated by a short prefix, and every per-user key starts with the
//! owner's big-endian id so a user's rows form one contiguous range:
//!
//! - `users`: `name:<digest(name)>` holds the record,
//!   `fp:<fingerprint>` indexes key ownership
//! - `contacts`: `<owner>n:<lookup(name)>` holds the record,
//!   `<owner>k:<lookup(key)>` points back at the primary key
//! - `emails`: `<owner>e:<seq-be>` holds the record,
//!   `<owner>h:<lookup(hash)>` maps the dedup lookup to the sequence
//! - `connections`: `<owner>c:<lookup(host)>` holds the record
//!
//! Sensitive fields are individually encrypted under the owner's
//! strengthened key before they reach a record; lookup hashes are keyed with
//! that same strengthened key, so equality checks work without revealing
//! what is being compared.

use serde::{Deserialize, Serialize};

use hushpost_crypto::{digest, Fingerprint};

/// Tree holding user records and the fingerprint index
pub(crate) const TREE_USERS: &str = "users";
/// Tree holding contact records per user
pub(crate) const TREE_CONTACTS: &str = "contacts";
/// Tree holding stored emails per user
pub(crate) const TREE_EMAILS: &str = "emails";
/// Tree holding relay connections per user
pub(crate) const TREE_CONNECTIONS: &str = "connections";

/// One vault account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    /// Store-assigned owner id
    pub id: u64,
    /// Fingerprint of the account keypair
    pub fingerprint: Fingerprint,
    /// Password check value, derived from the strengthened key and the name
    #[serde(with = "hex::serde")]
    pub verifier: [u8; 32],
    /// Per-user entropy salt
    #[serde(with = "hex::serde")]
    pub salt: [u8; 32],
    /// Keypair seed, sealed under the strengthened key
    pub secret_key_ct: Vec<u8>,
    /// Friend-to-friend mode flag
    pub f2f: bool,
}

/// One contact; name and key are ciphertexts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ContactRecord {
    pub name_ct: Vec<u8>,
    pub public_key_ct: Vec<u8>,
}

/// One stored email; every payload field is a ciphertext
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct EmailRecord {
    /// Keyed lookup of the envelope hash; survives deletion for dedup
    #[serde(with = "hex::serde")]
    pub hash_lookup: [u8; 32],
    pub sender_key_ct: Vec<u8>,
    pub sender_name_ct: Vec<u8>,
    pub title_ct: Vec<u8>,
    pub body_ct: Vec<u8>,
    pub time_ct: Vec<u8>,
    /// Tombstone; a deleted row keeps its key and lookup, loses its payload
    pub deleted: bool,
}

/// One relay connection; host and optional secret are ciphertexts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ConnectionRecord {
    pub host_ct: Vec<u8>,
    pub secret_ct: Option<Vec<u8>>,
}

/// Primary key for a user record
pub(crate) fn user_key(name: &str) -> Vec<u8> {
    let mut key = b"name:".to_vec();
    key.extend_from_slice(&digest(&[name.as_bytes()]));
    key
}

/// Index key claiming a fingerprint for one user
pub(crate) fn fingerprint_key(fingerprint: &Fingerprint) -> Vec<u8> {
    let mut key = b"fp:".to_vec();
    key.extend_from_slice(fingerprint.as_bytes());
    key
}

/// Prefix covering every row a user owns in a per-user tree
pub(crate) fn owner_prefix(owner: u64) -> [u8; 8] {
    owner.to_be_bytes()
}

fn owner_key(owner: u64, tag: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = owner_prefix(owner).to_vec();
    key.extend_from_slice(tag);
    key.extend_from_slice(suffix);
    key
}

/// Contact primary key, by keyed name lookup
pub(crate) fn contact_name_key(owner: u64, name_lookup: &[u8; 32]) -> Vec<u8> {
    owner_key(owner, b"n:", name_lookup)
}

/// Contact index key, by keyed public-key lookup
pub(crate) fn contact_key_index(owner: u64, key_lookup: &[u8; 32]) -> Vec<u8> {
    owner_key(owner, b"k:", key_lookup)
}

/// Prefix covering a user's contact primary keys
pub(crate) fn contact_scan_prefix(owner: u64) -> Vec<u8> {
    owner_key(owner, b"n:", &[])
}

/// Email primary key, in insertion order
pub(crate) fn email_seq_key(owner: u64, seq: u64) -> Vec<u8> {
    owner_key(owner, b"e:", &seq.to_be_bytes())
}

/// Email dedup index key, by keyed envelope-hash lookup
pub(crate) fn email_hash_key(owner: u64, hash_lookup: &[u8; 32]) -> Vec<u8> {
    owner_key(owner, b"h:", hash_lookup)
}

/// Prefix covering a user's email primary keys
pub(crate) fn email_scan_prefix(owner: u64) -> Vec<u8> {
    owner_key(owner, b"e:", &[])
}

/// Connection primary key, by keyed host lookup
pub(crate) fn connection_key(owner: u64, host_lookup: &[u8; 32]) -> Vec<u8> {
    owner_key(owner, b"c:", host_lookup)
}

/// Prefix covering a user's connection keys
pub(crate) fn connection_scan_prefix(owner: u64) -> Vec<u8> {
    owner_key(owner, b"c:", &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_rows_share_one_range() {
        let prefix = owner_prefix(7);

        for key in [
            contact_name_key(7, &[1; 32]),
            contact_key_index(7, &[2; 32]),
            email_seq_key(7, 42),
            email_hash_key(7, &[3; 32]),
            connection_key(7, &[4; 32]),
        ] {
            assert!(key.starts_with(&prefix));
        }

        assert!(!email_seq_key(8, 42).starts_with(&prefix));
    }

    #[test]
    fn test_email_seq_keys_sort_by_insertion() {
        let keys: Vec<_> = [1u64, 9, 10, 255, 256]
            .iter()
            .map(|seq| email_seq_key(3, *seq))
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_primary_and_index_keys_disjoint() {
        let lookup = [5u8; 32];
        assert_ne!(contact_name_key(1, &lookup), contact_key_index(1, &lookup));
        assert_ne!(email_hash_key(1, &lookup), connection_key(1, &lookup));
    }

    #[test]
    fn test_user_record_roundtrip() {
        let record = UserRecord {
            id: 9,
            fingerprint: Fingerprint::from_bytes([7; 32]),
            verifier: [1; 32],
            salt: [2; 32],
            secret_key_ct: vec![3, 4, 5],
            f2f: true,
        };

        let bytes = bincode::serialize(&record).unwrap();
        let back: UserRecord = bincode::deserialize(&bytes).unwrap();

        assert_eq!(back.id, record.id);
        assert_eq!(back.fingerprint, record.fingerprint);
        assert_eq!(back.verifier, record.verifier);
        assert_eq!(back.secret_key_ct, record.secret_key_ct);
        assert!(back.f2f);
    }
}
