//! Contact list and relay connections
//!
//! Both live per user under keyed lookup hashes: a contact is addressed by
//! its name or its public key, a connection by its host. Stored names,
//! keys, hosts, and secrets are ciphertexts; listing decrypts on the way
//! out.

use tracing::debug;

use hushpost_crypto::PublicKey;

use crate::error::{ClientError, Result};
use crate::records::{
    connection_key, connection_scan_prefix, contact_key_index, contact_name_key,
    contact_scan_prefix, ConnectionRecord, ContactRecord,
};
use crate::vault::{Vault, VaultSession};

/// One configured relay endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Relay host (host:port, scheme optional)
    pub host: String,
    /// Shared federation secret for trusted relays
    pub secret: Option<String>,
}

impl Vault {
    /// Add a contact; both the name and the key must be new for this user
    pub fn set_contact(
        &self,
        session: &VaultSession,
        name: &str,
        public_key: &PublicKey,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::InvalidName(
                "contact name must not be empty".to_string(),
            ));
        }

        let key_bytes = public_key.to_bytes();
        let _guard = self.write_lock.lock();

        let name_key = contact_name_key(session.user_id, &session.lookup(name.as_bytes()));
        let key_index = contact_key_index(session.user_id, &session.lookup(&key_bytes));
        if self.contacts.contains_key(&name_key)? || self.contacts.contains_key(&key_index)? {
            return Err(ClientError::ContactExists);
        }

        let record = ContactRecord {
            name_ct: session.seal_field(name.as_bytes())?,
            public_key_ct: session.seal_field(&key_bytes)?,
        };

        self.contacts
            .insert(name_key.as_slice(), bincode::serialize(&record)?)?;
        self.contacts.insert(key_index.as_slice(), name_key.as_slice())?;

        debug!("Added contact {} for {}", public_key.fingerprint(), session.fingerprint);
        Ok(())
    }

    /// Remove a contact by public key; absent contacts are a no-op
    pub fn del_contact(&self, session: &VaultSession, public_key: &PublicKey) -> Result<()> {
        let _guard = self.write_lock.lock();

        let key_index =
            contact_key_index(session.user_id, &session.lookup(&public_key.to_bytes()));
        if let Some(name_key) = self.contacts.remove(key_index)? {
            self.contacts.remove(name_key)?;
        }
        Ok(())
    }

    /// Whether a public key is in this user's contact list
    pub fn is_contact(&self, session: &VaultSession, public_key: &PublicKey) -> Result<bool> {
        let key_index =
            contact_key_index(session.user_id, &session.lookup(&public_key.to_bytes()));
        Ok(self.contacts.contains_key(key_index)?)
    }

    /// Decrypted contact list; rows that no longer open are skipped
    pub fn contacts(&self, session: &VaultSession) -> Result<Vec<(String, PublicKey)>> {
        let mut out = Vec::new();
        for item in self.contacts.scan_prefix(contact_scan_prefix(session.user_id)) {
            let (_, raw) = item?;
            let record: ContactRecord = bincode::deserialize(&raw)?;

            let name = match session.open_string(&record.name_ct) {
                Some(name) => name,
                None => continue,
            };
            let key_bytes: [u8; 32] = match session
                .open_field(&record.public_key_ct)
                .and_then(|bytes| bytes.try_into().ok())
            {
                Some(bytes) => bytes,
                None => continue,
            };
            let public_key = match PublicKey::from_bytes(&key_bytes) {
                Ok(key) => key,
                Err(_) => continue,
            };
            out.push((name, public_key));
        }
        Ok(out)
    }

    /// Add a relay connection; a known host gets its secret replaced
    pub fn set_connection(
        &self,
        session: &VaultSession,
        host: &str,
        secret: Option<&str>,
    ) -> Result<()> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ClientError::InvalidHost);
        }

        let _guard = self.write_lock.lock();

        let record = ConnectionRecord {
            host_ct: session.seal_field(host.as_bytes())?,
            secret_ct: secret
                .map(|secret| session.seal_field(secret.as_bytes()))
                .transpose()?,
        };

        let key = connection_key(session.user_id, &session.lookup(host.as_bytes()));
        self.connections
            .insert(key, bincode::serialize(&record)?)?;

        debug!("Connection {} set for {}", host, session.fingerprint);
        Ok(())
    }

    /// Remove a relay connection; absent hosts are a no-op
    pub fn del_connection(&self, session: &VaultSession, host: &str) -> Result<()> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ClientError::InvalidHost);
        }

        let _guard = self.write_lock.lock();
        let key = connection_key(session.user_id, &session.lookup(host.as_bytes()));
        self.connections.remove(key)?;
        Ok(())
    }

    /// Decrypted relay connections; rows that no longer open are skipped
    pub fn connections(&self, session: &VaultSession) -> Result<Vec<Connection>> {
        let mut out = Vec::new();
        for item in self
            .connections
            .scan_prefix(connection_scan_prefix(session.user_id))
        {
            let (_, raw) = item?;
            let record: ConnectionRecord = bincode::deserialize(&raw)?;

            let host = match session.open_string(&record.host_ct) {
                Some(host) => host,
                None => continue,
            };
            let secret = match record.secret_ct {
                Some(ciphertext) => match session.open_string(&ciphertext) {
                    Some(secret) => Some(secret),
                    None => continue,
                },
                None => None,
            };
            out.push(Connection { host, secret });
        }
        Ok(out)
    }
}
