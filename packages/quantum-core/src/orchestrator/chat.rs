//! # Chat Secrets
//!
//! A chat secret is derived once per participant set and cached in the
//! secure store. The first derivation is authoritative: re-deriving for the
//! same participants yields the same `chat_id` but a different secret, so
//! every member must use the cached (or distributed) copy.
//!
//! ```text
//! generate_chat_secret([pkA, pkB, pkC])          (one caller at a time)
//!     │
//!     ├─► chat_id = hex(SHA-256(sorted pks))[..32]
//!     ├─► cached under "chat.secret.<chat_id>"? ──► return cached secret
//!     └─► derive_group_secret ──► cache (TTL) ──► return
//! ```
//!
//! Encrypt and decrypt always use the secret the caller passes in. The
//! cache is only compared against it: a different secret under the same
//! `chat_id` (another device's derivation) is logged, never substituted.

use serde::{Deserialize, Serialize};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::crypto::kem::{fingerprint, ALGORITHM_TAG, SHARED_SECRET_SIZE};
use crate::crypto::seal::TAG_SIZE;
use crate::crypto::GroupSecret;
use crate::error::{Error, Result};

const CACHED_LEN: usize = SHARED_SECRET_SIZE + 8;

/// Symmetric secret shared by the members of one chat
#[derive(Clone, ZeroizeOnDrop)]
pub struct ChatSecret {
    /// Deterministic identifier of the participant set
    #[zeroize(skip)]
    pub chat_id: String,
    /// 32-byte chat key
    pub shared_secret: [u8; SHARED_SECRET_SIZE],
    /// Participant fingerprints in sorted public-key order
    #[zeroize(skip)]
    pub participants: Vec<String>,
    /// Algorithm identifier
    #[zeroize(skip)]
    pub algorithm_tag: String,
    /// When the secret was first derived (Unix milliseconds)
    #[zeroize(skip)]
    pub created_at_ms: i64,
}

impl ChatSecret {
    pub(crate) fn from_group(group: &GroupSecret, created_at_ms: i64) -> Self {
        Self {
            chat_id: group.chat_id.clone(),
            shared_secret: group.secret,
            participants: group.participants.iter().map(|pk| fingerprint(pk)).collect(),
            algorithm_tag: ALGORITHM_TAG.to_string(),
            created_at_ms,
        }
    }

    /// Whether the holder of `public_key` belongs to this chat
    pub fn has_participant(&self, public_key: &[u8]) -> bool {
        let id = fingerprint(public_key);
        self.participants.iter().any(|p| *p == id)
    }

    /// Bytes cached in the secure store: `secret ‖ created_at_ms (LE)`
    pub(crate) fn cache_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(CACHED_LEN));
        out.extend_from_slice(&self.shared_secret);
        out.extend_from_slice(&self.created_at_ms.to_le_bytes());
        out
    }

    /// Rebuild a cached secret for `participants` (sorted public keys)
    pub(crate) fn from_cache(chat_id: String, participants: &[Vec<u8>], cached: &[u8]) -> Result<Self> {
        let (secret, created_at_ms) = parse_cached(cached)?;
        Ok(Self {
            chat_id,
            shared_secret: secret,
            participants: participants.iter().map(|pk| fingerprint(pk)).collect(),
            algorithm_tag: ALGORITHM_TAG.to_string(),
            created_at_ms,
        })
    }
}

impl std::fmt::Debug for ChatSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSecret")
            .field("chat_id", &self.chat_id)
            .field("participants", &self.participants)
            .field("algorithm_tag", &self.algorithm_tag)
            .field("created_at_ms", &self.created_at_ms)
            .field("shared_secret", &"[REDACTED]")
            .finish()
    }
}

/// Split a cached value into the secret and its creation time
pub(crate) fn parse_cached(cached: &[u8]) -> Result<([u8; SHARED_SECRET_SIZE], i64)> {
    if cached.len() != CACHED_LEN {
        return Err(Error::StorageCorrupted(format!(
            "cached chat secret is {} bytes, expected {}",
            cached.len(),
            CACHED_LEN
        )));
    }
    let mut secret = [0u8; SHARED_SECRET_SIZE];
    secret.copy_from_slice(&cached[..SHARED_SECRET_SIZE]);
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&cached[SHARED_SECRET_SIZE..]);
    Ok((secret, i64::from_le_bytes(ts)))
}

/// A message encrypted under a chat secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCiphertext {
    /// Chat the message belongs to
    pub chat_id: String,
    /// `nonce ‖ ChaCha20 ciphertext`
    pub cipher_bytes: Vec<u8>,
    /// Keyed SHAKE-256 tag over `cipher_bytes`
    pub auth_tag: [u8; TAG_SIZE],
    /// Fingerprint of the sender's public key
    pub sender_id: String,
    /// Creation time (Unix milliseconds)
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> ChatSecret {
        ChatSecret {
            chat_id: "abc".into(),
            shared_secret: [7u8; SHARED_SECRET_SIZE],
            participants: vec!["p1".into(), "p2".into()],
            algorithm_tag: ALGORITHM_TAG.into(),
            created_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_cache_bytes_roundtrip() {
        let original = secret();
        let cached = original.cache_bytes();
        let members = vec![vec![1u8; 4], vec![2u8; 4]];

        let restored = ChatSecret::from_cache("abc".into(), &members, &cached).unwrap();
        assert_eq!(restored.shared_secret, original.shared_secret);
        assert_eq!(restored.created_at_ms, original.created_at_ms);
        assert_eq!(restored.chat_id, "abc");
        assert!(restored.has_participant(&[2u8; 4]));
        assert!(!restored.has_participant(&[3u8; 4]));
    }

    #[test]
    fn test_truncated_cache_rejected() {
        let result = parse_cached(&[0u8; 10]);
        assert!(matches!(result, Err(Error::StorageCorrupted(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", secret());
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("[7, 7"));
    }
}
