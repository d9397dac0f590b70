//! # Key Derivation Functions
//!
//! Every symmetric key in Quantum Core comes out of one of three derivations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY DERIVATION OVERVIEW                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KEM shared secret / group master                                      │
//! │         │                                                               │
//! │         └──► SHAKE-256(ikm ‖ domain) ──► 64 bytes                      │
//! │                                          ├─ [0..32]  stream cipher key │
//! │                                          └─ [32..64] tag key           │
//! │                                                                         │
//! │  Session shared secret                                                 │
//! │         │                                                               │
//! │         └──► HKDF-SHA256(salt = sorted public keys,                    │
//! │                          info = "quantum-core-session-key-v1")         │
//! │                                                                         │
//! │  Secure store entry                                                    │
//! │         │                                                               │
//! │         └──► scrypt(master ‖ len ‖ entry name ‖ session id,            │
//! │                     salt = 32 random bytes, N = 2^15, r = 8, p = 1)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! | Aspect | Design Choice | Rationale |
//! |--------|---------------|-----------|
//! | Message KDF | SHAKE-256 XOF | One call yields both cipher and tag keys |
//! | Key Separation | Per-purpose domain strings | Same secret never keys two protocols |
//! | Store KDF | scrypt | Memory-hard against offline guessing of dumps |
//! | Version String | "-v1" suffix | Allows future algorithm upgrades |

use hkdf::Hkdf;
use sha2::Sha256;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Domain separation strings
///
/// These ensure that keys derived for different purposes are cryptographically
/// independent, even when derived from the same secret.
pub mod domain {
    /// Direct (1:1) hybrid messages
    pub const HYBRID_MESSAGE: &[u8] = b"quantum-core-hybrid-message-v1";

    /// Wallet memos
    pub const MEMO: &[u8] = b"quantum-core-memo-v1";

    /// Group / chat secret derivation
    pub const GROUP_SECRET: &[u8] = b"quantum-core-group-secret-v1";

    /// Messages encrypted under an established chat secret
    pub const CHAT_MESSAGE: &[u8] = b"quantum-core-chat-message-v1";

    /// Pairwise session keys
    pub const SESSION_KEY: &[u8] = b"quantum-core-session-key-v1";

    /// Secure store entries
    pub const STORE_ENTRY: &[u8] = b"quantum-core-store-entry-v1";
}

/// Size of derived symmetric keys in bytes
pub const DERIVED_KEY_SIZE: usize = 32;

/// A stream cipher key and a tag key derived together
#[derive(ZeroizeOnDrop)]
pub struct MessageKeys {
    /// ChaCha20 key
    pub cipher_key: [u8; DERIVED_KEY_SIZE],
    /// Keyed-SHAKE tag key
    pub tag_key: [u8; DERIVED_KEY_SIZE],
}

/// Squeeze `out.len()` bytes from SHAKE-256 over `parts ‖ domain`
pub fn shake_kdf(parts: &[&[u8]], domain: &[u8], out: &mut [u8]) {
    let mut xof = Shake256::default();
    for part in parts {
        xof.update(part);
    }
    xof.update(domain);
    xof.finalize_xof().read(out);
}

/// Derive the cipher and tag keys for one message
pub fn derive_message_keys(secret: &[u8], domain: &[u8]) -> MessageKeys {
    let mut okm = Zeroizing::new([0u8; 2 * DERIVED_KEY_SIZE]);
    shake_kdf(&[secret], domain, &mut okm[..]);

    let mut keys = MessageKeys {
        cipher_key: [0u8; DERIVED_KEY_SIZE],
        tag_key: [0u8; DERIVED_KEY_SIZE],
    };
    keys.cipher_key.copy_from_slice(&okm[..DERIVED_KEY_SIZE]);
    keys.tag_key.copy_from_slice(&okm[DERIVED_KEY_SIZE..]);
    keys
}

/// Derive a session key from a KEM shared secret
///
/// ## Parameters
///
/// - `shared_secret`: Raw 32-byte KEM shared secret
/// - `salt`: Binds the key to both parties (hash of their sorted public keys)
pub fn derive_session_key(shared_secret: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), shared_secret);

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
    hkdf.expand(domain::SESSION_KEY, &mut key[..])
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

    Ok(key)
}

/// Cost parameters for the store's memory-hard KDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptCost {
    /// log2(N)
    pub log_n: u8,
    /// Block size
    pub r: u32,
    /// Parallelism
    pub p: u32,
}

impl ScryptCost {
    /// N = 2^15, r = 8, p = 1
    pub const DEFAULT: ScryptCost = ScryptCost { log_n: 15, r: 8, p: 1 };

    fn params(&self) -> Result<scrypt::Params> {
        scrypt::Params::new(self.log_n, self.r, self.p, DERIVED_KEY_SIZE)
            .map_err(|e| Error::KeyDerivationFailed(format!("Invalid scrypt parameters: {}", e)))
    }
}

impl Default for ScryptCost {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Derive the per-entry key for the secure store
///
/// The password is `master ‖ len(entry_name) ‖ entry_name ‖ session_id`; the
/// length prefix keeps `("ab", "c…")` and `("a", "bc…")` apart.
pub fn derive_entry_key(
    master_key: &[u8],
    entry_name: &str,
    session_id: &str,
    salt: &[u8],
    cost: ScryptCost,
) -> Result<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
    let mut password = Zeroizing::new(Vec::with_capacity(
        master_key.len() + 4 + entry_name.len() + session_id.len() + domain::STORE_ENTRY.len(),
    ));
    password.extend_from_slice(domain::STORE_ENTRY);
    password.extend_from_slice(master_key);
    password.extend_from_slice(&(entry_name.len() as u32).to_le_bytes());
    password.extend_from_slice(entry_name.as_bytes());
    password.extend_from_slice(session_id.as_bytes());

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
    scrypt::scrypt(&password, salt, &cost.params()?, &mut key[..])
        .map_err(|e| Error::KeyDerivationFailed(format!("scrypt failed: {}", e)))?;

    Ok(key)
}

// ============================================================================
// TESTS
// ============================================================================
