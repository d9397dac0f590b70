//! # Secure Store
//!
//! In-memory, encrypted, time-expiring storage for short-lived secrets
//! (cached chat secrets, private-key material in use).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SECURE STORE                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  store(name, bytes, ttl)                                               │
//! │     │                                                                   │
//! │     ├─► salt = 32 random bytes                                         │
//! │     ├─► entry_key = scrypt(master ‖ name ‖ session_id, salt)           │
//! │     ├─► seal(entry_key) ──► nonce, cipher_bytes, tag                   │
//! │     └─► entries[name] = StoredEntry { …, expires_at_ms }               │
//! │                                                                         │
//! │  retrieve(name)                                                        │
//! │     ├─► expired? ──► remove, return None                               │
//! │     └─► re-derive entry_key, verify tag, decrypt                       │
//! │                                                                         │
//! │  Master key and session id live only as long as the session.           │
//! │  Nothing is ever written to disk.                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An expired entry is indistinguishable from one that was never stored.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::chacha20::NONCE_SIZE;
use crate::crypto::kdf::{self, domain, ScryptCost};
use crate::crypto::seal::{self, TAG_SIZE};
use crate::crypto::EntropySource;
use crate::error::{Error, Result};
use crate::time::now_timestamp_millis;

/// Size of the per-entry salt in bytes
pub const SALT_SIZE: usize = 32;

const MS_PER_MINUTE: i64 = 60_000;

/// Secure store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// scrypt log2(N)
    pub scrypt_log_n: u8,
    /// scrypt block size
    pub scrypt_r: u32,
    /// scrypt parallelism
    pub scrypt_p: u32,
    /// TTL used when callers don't pick one
    pub default_ttl_minutes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            scrypt_log_n: ScryptCost::DEFAULT.log_n,
            scrypt_r: ScryptCost::DEFAULT.r,
            scrypt_p: ScryptCost::DEFAULT.p,
            default_ttl_minutes: 30,
        }
    }
}

impl StoreConfig {
    /// Cheap scrypt parameters for tests and benchmarks
    pub fn fast() -> Self {
        Self {
            scrypt_log_n: 4,
            ..Self::default()
        }
    }

    fn cost(&self) -> ScryptCost {
        ScryptCost {
            log_n: self.scrypt_log_n,
            r: self.scrypt_r,
            p: self.scrypt_p,
        }
    }
}

/// One encrypted entry
///
/// Every field is wiped when the entry is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StoredEntry {
    /// ChaCha20 ciphertext
    pub cipher_bytes: Vec<u8>,
    /// scrypt salt
    pub salt: [u8; SALT_SIZE],
    /// Stream cipher nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Tag over `nonce ‖ cipher_bytes`
    pub tag: [u8; TAG_SIZE],
    /// Creation time (Unix milliseconds)
    pub created_at_ms: i64,
    /// Expiry time (Unix milliseconds)
    pub expires_at_ms: i64,
}

impl StoredEntry {
    /// Whether the entry is past its TTL at `now_ms`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }

    fn body(&self) -> Zeroizing<Vec<u8>> {
        let mut body = Zeroizing::new(Vec::with_capacity(NONCE_SIZE + self.cipher_bytes.len()));
        body.extend_from_slice(&self.nonce);
        body.extend_from_slice(&self.cipher_bytes);
        body
    }
}

struct Session {
    id: String,
    master_key: Zeroizing<[u8; kdf::DERIVED_KEY_SIZE]>,
}

impl Session {
    fn open(entropy: &EntropySource) -> Result<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            master_key: entropy.generate_symmetric_key()?,
        })
    }

    fn snapshot(&self) -> (String, Zeroizing<[u8; kdf::DERIVED_KEY_SIZE]>) {
        (self.id.clone(), self.master_key.clone())
    }
}

struct StoreState {
    entries: HashMap<String, StoredEntry>,
    // None once the store has been torn down and could not be reseeded
    session: Option<Session>,
}

/// Ephemeral encrypted key/value store
pub struct SecureStore {
    state: RwLock<StoreState>,
    entropy: Arc<EntropySource>,
    config: StoreConfig,
}

impl SecureStore {
    /// Create a store with a fresh master key and session id
    pub fn new(entropy: Arc<EntropySource>, config: StoreConfig) -> Result<Self> {
        let session = Session::open(&entropy)?;
        tracing::debug!(session_id = %session.id, "Secure store session opened");

        Ok(Self {
            state: RwLock::new(StoreState {
                entries: HashMap::new(),
                session: Some(session),
            }),
            entropy,
            config,
        })
    }

    /// Current session id
    pub fn session_id(&self) -> Option<String> {
        self.state.read().session.as_ref().map(|s| s.id.clone())
    }

    /// The store's configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Encrypt and store `value` under `key` for `ttl_minutes`
    ///
    /// `ttl_minutes = 0` stores an entry that is already expired. Storing
    /// under an existing key replaces (and wipes) the old entry.
    pub fn store(&self, key: &str, value: &[u8], ttl_minutes: u64) -> Result<()> {
        let (session_id, master_key) = self.session_snapshot()?;

        let mut salt = [0u8; SALT_SIZE];
        self.entropy.fill(&mut salt)?;

        let entry_key = kdf::derive_entry_key(&master_key[..], key, &session_id, &salt, self.config.cost())?;
        let sealed = seal::seal(&self.entropy, &entry_key[..], domain::STORE_ENTRY, value)
            .map_err(|e| Error::StorageWriteError(e.to_string()))?;

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&sealed.body[..NONCE_SIZE]);

        let now = now_timestamp_millis();
        let ttl_ms = i64::try_from(ttl_minutes).unwrap_or(i64::MAX).saturating_mul(MS_PER_MINUTE);
        let entry = StoredEntry {
            cipher_bytes: sealed.body[NONCE_SIZE..].to_vec(),
            salt,
            nonce,
            tag: sealed.tag,
            created_at_ms: now,
            expires_at_ms: now.saturating_add(ttl_ms),
        };

        let mut state = self.state.write();
        let same_session = state.session.as_ref().is_some_and(|s| s.id == session_id);
        if !same_session {
            return Err(Error::StorageWriteError(
                "store was cleared while the entry was being written".into(),
            ));
        }
        state.entries.insert(key.to_string(), entry);
        tracing::debug!(key, ttl_minutes, "Stored secure entry");
        Ok(())
    }

    /// Store with the configured default TTL
    pub fn store_default(&self, key: &str, value: &[u8]) -> Result<()> {
        self.store(key, value, self.config.default_ttl_minutes)
    }

    /// Retrieve and decrypt the value stored under `key`
    ///
    /// Returns `Ok(None)` for missing and expired entries alike; an expired
    /// entry is removed on the way out.
    pub fn retrieve(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let now = now_timestamp_millis();

        let snapshot = {
            let state = self.state.read();
            match state.entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_expired(now) => None,
                Some(entry) => {
                    let session = state.session.as_ref().ok_or(Error::NotInitialized)?;
                    let (id, master) = session.snapshot();
                    Some((entry.clone(), id, master))
                }
            }
        };

        let Some((entry, session_id, master_key)) = snapshot else {
            self.remove_if_expired(key);
            return Ok(None);
        };

        let entry_key = kdf::derive_entry_key(&master_key[..], key, &session_id, &entry.salt, self.config.cost())?;
        let plaintext = seal::open(&entry_key[..], domain::STORE_ENTRY, &entry.body(), &entry.tag)
            .map_err(|e| Error::StorageCorrupted(format!("{}: {}", key, e)))?;

        Ok(Some(plaintext))
    }

    /// Remove an entry, wiping its ciphertext
    pub fn remove(&self, key: &str) -> bool {
        self.state.write().entries.remove(key).is_some()
    }

    /// Whether a live (unexpired) entry exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        let now = now_timestamp_millis();
        self.state
            .read()
            .entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = now_timestamp_millis();
        self.state
            .read()
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Whether the store holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry and return how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = now_timestamp_millis();
        let mut state = self.state.write();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();

        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired secure entries");
        }
        removed
    }

    /// Wipe every entry and the master key, then start a new session
    ///
    /// Entries stored before the call can never be opened again. If the
    /// entropy source fails while reseeding, the store stays closed and
    /// every later operation returns `NotInitialized`.
    pub fn clear_all(&self) -> Result<()> {
        let mut state = self.state.write();
        let count = state.entries.len();
        state.entries.clear();
        state.session = None;

        let session = Session::open(&self.entropy)?;
        tracing::info!(cleared = count, session_id = %session.id, "Secure store cleared");
        state.session = Some(session);
        Ok(())
    }

    /// Wipe everything and leave the store closed
    pub fn close(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.session = None;
        tracing::debug!("Secure store closed");
    }

    fn session_snapshot(&self) -> Result<(String, Zeroizing<[u8; kdf::DERIVED_KEY_SIZE]>)> {
        self.state
            .read()
            .session
            .as_ref()
            .map(Session::snapshot)
            .ok_or(Error::NotInitialized)
    }

    fn remove_if_expired(&self, key: &str) {
        let now = now_timestamp_millis();
        let mut state = self.state.write();
        if state.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            if let Some(entry) = state.entries.remove(key) {
                tracing::debug!(key, age_ms = now - entry.created_at_ms, "Removed expired secure entry");
            }
        }
    }
}

impl std::fmt::Debug for SecureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("SecureStore")
            .field("entries", &state.entries.len())
            .field("session_id", &state.session.as_ref().map(|s| s.id.as_str()))
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
