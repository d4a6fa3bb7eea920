//! Password-locked local vault
//!
//! Accounts, contacts, emails, and relay connections live in one sled
//! database. Nothing sensitive is stored in the clear: a user's keypair seed
//! and every contact, email, and connection field are sealed under a key
//! strengthened from the password, and lookups go through keyed hashes. A
//! single mutex serializes writes so existence checks and inserts are one
//! step.

use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info};
use zeroize::ZeroizeOnDrop;

use hushpost_crypto::{
    constant_time_eq, digest, random_bytes, strengthen, verifier, Fingerprint, Keypair,
    SecretCipher,
};

use crate::error::{ClientError, Result};
use crate::records::{
    fingerprint_key, owner_prefix, user_key, UserRecord, TREE_CONNECTIONS, TREE_CONTACTS,
    TREE_EMAILS, TREE_USERS,
};

/// Minimum account/sender name length in bytes
pub const NAME_MIN: usize = 6;
/// Maximum account/sender name length in bytes
pub const NAME_MAX: usize = 64;
/// Minimum password length in bytes
pub const PASSWORD_MIN: usize = 8;
/// Default password strengthening work factor (2^bits digests)
pub const DEFAULT_ENTROPY_BITS: u8 = 20;

/// Vault tuning knobs
#[derive(Clone, Copy, Debug)]
pub struct VaultOptions {
    /// Password strengthening work factor, in bits
    pub entropy_bits: u8,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            entropy_bits: DEFAULT_ENTROPY_BITS,
        }
    }
}

/// An authenticated user's unlocked view of the vault
///
/// Holds the strengthened key for the session's lifetime; key material is
/// wiped on drop.
#[derive(ZeroizeOnDrop)]
pub struct VaultSession {
    #[zeroize(skip)]
    pub(crate) user_id: u64,
    pub(crate) name: String,
    #[zeroize(skip)]
    pub(crate) fingerprint: Fingerprint,
    #[zeroize(skip)]
    pub(crate) keypair: Keypair,
    pub(crate) master: [u8; 32],
    #[zeroize(skip)]
    pub(crate) salt: [u8; 32],
    #[zeroize(skip)]
    pub(crate) cipher: SecretCipher,
}

impl VaultSession {
    /// Owner id of this account
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Account name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fingerprint of the account keypair
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The account keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Keyed lookup hash; lets the vault test equality without plaintext
    pub(crate) fn lookup(&self, data: &[u8]) -> [u8; 32] {
        digest(&[data, &self.master, &self.salt])
    }

    pub(crate) fn seal_field(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.cipher.seal(data)?)
    }

    pub(crate) fn open_field(&self, ciphertext: &[u8]) -> Option<Vec<u8>> {
        self.cipher.open(ciphertext)
    }

    pub(crate) fn open_string(&self, ciphertext: &[u8]) -> Option<String> {
        String::from_utf8(self.open_field(ciphertext)?).ok()
    }
}

/// The local encrypted store
pub struct Vault {
    pub(crate) db: sled::Db,
    pub(crate) users: sled::Tree,
    pub(crate) contacts: sled::Tree,
    pub(crate) emails: sled::Tree,
    pub(crate) connections: sled::Tree,
    options: VaultOptions,
    pub(crate) write_lock: Mutex<()>,
}

impl Vault {
    /// Open or create a vault at path
    pub fn open(path: &Path, options: VaultOptions) -> Result<Self> {
        let db = sled::open(path)?;
        Self::with_db(db, options)
    }

    /// Open a throwaway vault backed by a temp file (tests)
    pub fn temporary(options: VaultOptions) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db, options)
    }

    fn with_db(db: sled::Db, options: VaultOptions) -> Result<Self> {
        let users = db.open_tree(TREE_USERS)?;
        let contacts = db.open_tree(TREE_CONTACTS)?;
        let emails = db.open_tree(TREE_EMAILS)?;
        let connections = db.open_tree(TREE_CONNECTIONS)?;

        Ok(Self {
            db,
            users,
            contacts,
            emails,
            connections,
            options,
            write_lock: Mutex::new(()),
        })
    }

    /// Flush to durable storage
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Create an account
    ///
    /// Generates a keypair when none is supplied. The name is trimmed and
    /// both the name and the keypair fingerprint must be unused.
    pub fn create_user(
        &self,
        name: &str,
        password: &str,
        keypair: Option<Keypair>,
    ) -> Result<()> {
        let name = name.trim();
        if name.len() < NAME_MIN || name.len() > NAME_MAX {
            return Err(ClientError::InvalidName(format!(
                "name must be {} to {} bytes",
                NAME_MIN, NAME_MAX
            )));
        }
        if password.len() < PASSWORD_MIN {
            return Err(ClientError::InvalidPassword);
        }

        let keypair = keypair.unwrap_or_else(Keypair::generate);
        let fingerprint = keypair.fingerprint();

        let _guard = self.write_lock.lock();

        let name_key = user_key(name);
        if self.users.contains_key(&name_key)? {
            return Err(ClientError::UserExists);
        }
        let fp_key = fingerprint_key(&fingerprint);
        if self.users.contains_key(&fp_key)? {
            return Err(ClientError::FingerprintExists);
        }

        let salt: [u8; 32] = random_bytes();
        let master = strengthen(password.as_bytes(), &salt, self.options.entropy_bits);
        let cipher = SecretCipher::from_key(&master);

        let record = UserRecord {
            id: self.db.generate_id()?,
            fingerprint,
            verifier: verifier(&master, name.as_bytes()),
            salt,
            secret_key_ct: cipher.seal(&keypair.secret_bytes())?,
            f2f: false,
        };

        self.users.insert(name_key.as_slice(), bincode::serialize(&record)?)?;
        self.users.insert(fp_key.as_slice(), name_key.as_slice())?;
        self.db.flush()?;

        info!("Created account {}", fingerprint);
        Ok(())
    }

    /// Unlock an account
    ///
    /// Returns None on any mismatch, without distinguishing an unknown name
    /// from a wrong password.
    pub fn authenticate(&self, name: &str, password: &str) -> Option<VaultSession> {
        let name = name.trim();
        let raw = self.users.get(user_key(name)).ok().flatten()?;
        let record: UserRecord = bincode::deserialize(&raw).ok()?;

        let master = strengthen(password.as_bytes(), &record.salt, self.options.entropy_bits);
        if !constant_time_eq(&verifier(&master, name.as_bytes()), &record.verifier) {
            return None;
        }

        let cipher = SecretCipher::from_key(&master);
        let seed: [u8; 32] = cipher.open(&record.secret_key_ct)?.try_into().ok()?;
        let keypair = Keypair::from_secret_bytes(&seed);

        debug!("Unlocked account {}", record.fingerprint);
        Some(VaultSession {
            user_id: record.id,
            name: name.to_string(),
            fingerprint: record.fingerprint,
            keypair,
            master,
            salt: record.salt,
            cipher,
        })
    }

    /// Remove an account and everything it owns
    pub fn delete_user(&self, session: &VaultSession) -> Result<()> {
        let _guard = self.write_lock.lock();

        self.users.remove(user_key(&session.name))?;
        self.users.remove(fingerprint_key(&session.fingerprint))?;

        for tree in [&self.contacts, &self.emails, &self.connections] {
            let keys: Vec<_> = tree
                .scan_prefix(owner_prefix(session.user_id))
                .keys()
                .collect::<std::result::Result<_, _>>()?;
            for key in keys {
                tree.remove(key)?;
            }
        }
        self.db.flush()?;

        info!("Deleted account {}", session.fingerprint);
        Ok(())
    }

    /// Whether friend-to-friend mode is on; unknown senders are refused then
    pub fn f2f_enabled(&self, session: &VaultSession) -> Result<bool> {
        Ok(self.load_user(&session.name)?.f2f)
    }

    /// Flip friend-to-friend mode; returns the new state
    pub fn switch_f2f(&self, session: &VaultSession) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let key = user_key(&session.name);
        let mut record = self.load_user(&session.name)?;
        record.f2f = !record.f2f;
        self.users.insert(key, bincode::serialize(&record)?)?;

        debug!("F2F for {} now {}", session.fingerprint, record.f2f);
        Ok(record.f2f)
    }

    pub(crate) fn load_user(&self, name: &str) -> Result<UserRecord> {
        let raw = self
            .users
            .get(user_key(name))?
            .ok_or_else(|| ClientError::Storage("user record missing".to_string()))?;
        Ok(bincode::deserialize(&raw)?)
    }
}
