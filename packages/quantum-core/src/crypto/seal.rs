//! # Sealed Bodies
//!
//! ChaCha20 for confidentiality plus a keyed SHAKE-256 tag for integrity.
//! Every encrypted payload in the crate (hybrid messages, memos, chat
//! messages, secure store entries) is a sealed body.
//!
//! ```text
//! secret ──► SHAKE-256(secret ‖ domain) ──┬─► cipher_key ──► ChaCha20(nonce) ──► ciphertext
//!                                         └─► tag_key
//!
//! body = nonce ‖ ciphertext
//! tag  = SHAKE-256(tag_key ‖ "quantum-core-seal-tag-v1" ‖ len(body) ‖ body)[..32]
//! ```
//!
//! `open` verifies the tag in constant time before decrypting. A wrong key,
//! a wrong domain or any flipped bit is a `DecryptionFailed` error; the
//! ciphertext is never handed back as plaintext.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::chacha20::{self, NONCE_SIZE};
use super::entropy::EntropySource;
use super::kdf;
use crate::error::{Error, Result};

/// Size of the authentication tag in bytes
pub const TAG_SIZE: usize = 32;

const TAG_DOMAIN: &[u8] = b"quantum-core-seal-tag-v1";

/// An encrypted payload with its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBody {
    /// `nonce ‖ ciphertext`
    pub body: Vec<u8>,
    /// Keyed SHAKE-256 tag over `body`
    pub tag: [u8; TAG_SIZE],
}

/// Compute the tag for `body` under `tag_key`
pub fn compute_tag(tag_key: &[u8], body: &[u8]) -> [u8; TAG_SIZE] {
    let mut xof = Shake256::default();
    xof.update(tag_key);
    xof.update(TAG_DOMAIN);
    xof.update(&(body.len() as u64).to_le_bytes());
    xof.update(body);

    let mut tag = [0u8; TAG_SIZE];
    xof.finalize_xof().read(&mut tag);
    tag
}

/// Encrypt and tag `plaintext` under keys derived from `secret` and `domain`
pub fn seal(entropy: &EntropySource, secret: &[u8], domain: &[u8], plaintext: &[u8]) -> Result<SealedBody> {
    let keys = kdf::derive_message_keys(secret, domain);
    let body = chacha20::encrypt(entropy, &keys.cipher_key, plaintext)?;
    let tag = compute_tag(&keys.tag_key, &body);
    Ok(SealedBody { body, tag })
}

/// Verify and decrypt a sealed body
pub fn open(secret: &[u8], domain: &[u8], body: &[u8], tag: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if body.len() < NONCE_SIZE {
        return Err(Error::InvalidMessage(format!(
            "cipher body of {} bytes is shorter than its nonce",
            body.len()
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(Error::InvalidMessage(format!(
            "authentication tag must be {} bytes, got {}",
            TAG_SIZE,
            tag.len()
        )));
    }

    let keys = kdf::derive_message_keys(secret, domain);
    let expected = compute_tag(&keys.tag_key, body);
    if !bool::from(expected[..].ct_eq(tag)) {
        return Err(Error::DecryptionFailed("authentication tag mismatch".into()));
    }

    chacha20::decrypt(&keys.cipher_key, body)
}

// ============================================================================
// TESTS
// ============================================================================
