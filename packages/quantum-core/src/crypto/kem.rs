//! # Key Encapsulation
//!
//! Kyber-1024 (NIST security level 5) wrapped with strict buffer validation,
//! and the hybrid constructions built on it.
//!
//! ## Hybrid Message Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       HYBRID ENCRYPTION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender                                        Recipient                │
//! │  ──────                                        ─────────                │
//! │                                                                         │
//! │  encapsulate(recipient_pk)                                              │
//! │     ├─► kem_ciphertext (1568 B) ─────────────► decapsulate(sk, ct)      │
//! │     └─► shared_secret (32 B)                        └─► shared_secret   │
//! │              │                                              │           │
//! │              ▼                                              ▼           │
//! │     SHAKE-256(ss ‖ domain)                        SHAKE-256(ss ‖ domain)│
//! │      ├─ cipher_key ─► ChaCha20 ─► body ─────────►  verify tag, decrypt  │
//! │      └─ tag_key ────► tag ──────────────────────►                       │
//! │                                                                         │
//! │  shared_secret and both derived keys are zeroized on every path.        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Buffer Sizes
//!
//! | Buffer | Bytes |
//! |--------|-------|
//! | Public key | 1568 |
//! | Secret key | 3168 |
//! | Ciphertext | 1568 |
//! | Shared secret | 32 |
//!
//! A wrong-sized buffer from the caller is a validation error. A wrong-sized
//! buffer coming out of the KEM itself means the implementation cannot be
//! trusted and is reported as `KemMisbehaving`.
//!
//! Decapsulating with the wrong secret key does not fail inside Kyber
//! (implicit rejection yields an unrelated secret); the tag check in
//! [`super::seal::open`] is what turns that into `DecryptionFailed`.

use pqcrypto_kyber::kyber1024;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::entropy::EntropySource;
use super::kdf::{self, domain};
use super::seal::{self, TAG_SIZE};
use crate::error::{Error, Result};
use crate::time::{now_timestamp_millis, Stopwatch};

/// Kyber-1024 public key size
pub const PUBLIC_KEY_SIZE: usize = 1568;

/// Kyber-1024 secret key size
pub const SECRET_KEY_SIZE: usize = 3168;

/// Kyber-1024 ciphertext size
pub const CIPHERTEXT_SIZE: usize = 1568;

/// Kyber-1024 shared secret size
pub const SHARED_SECRET_SIZE: usize = 32;

/// Algorithm identifier carried by every hybrid message
pub const ALGORITHM_TAG: &str = "Kyber1024-ChaCha20";

/// Human-readable security level
pub const SECURITY_LEVEL: &str = "NIST Level 5";

/// Soft latency budget for a single wrapper operation
pub const LATENCY_BUDGET_MS: f64 = 20.0;

// The secret key is indcpa_sk (1536) ‖ pk (1568) ‖ H(pk) (32) ‖ z (32)
const EMBEDDED_PUBLIC_KEY_OFFSET: usize = 1536;

const CHAT_ID_DOMAIN: &[u8] = b"quantum-core-chat-id-v1";
const CHAT_ID_BYTES: usize = 16;
const FINGERPRINT_BYTES: usize = 8;

// ============================================================================
// TYPES
// ============================================================================

/// A Kyber-1024 key pair
///
/// The secret key is zeroized on drop and never printed.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)]
    public_key: Vec<u8>,
    secret_key: Vec<u8>,
}

impl KeyPair {
    /// Rebuild a key pair from its secret key alone
    pub fn from_secret_key(secret_key: &[u8]) -> Result<Self> {
        let public_key = Self::public_from_secret(secret_key)?;
        Ok(Self {
            public_key,
            secret_key: secret_key.to_vec(),
        })
    }

    /// Recover the public key embedded in a Kyber-1024 secret key
    pub fn public_from_secret(secret_key: &[u8]) -> Result<Vec<u8>> {
        validate_len(secret_key, SECRET_KEY_SIZE, "Kyber-1024 secret key")?;
        Ok(secret_key[EMBEDDED_PUBLIC_KEY_OFFSET..EMBEDDED_PUBLIC_KEY_OFFSET + PUBLIC_KEY_SIZE].to_vec())
    }

    /// The public key (safe to share)
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The secret key
    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }

    /// Short identifier for the public key
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.fingerprint())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Result of encapsulating to a public key
///
/// The shared secret is single-use and zeroized on drop.
pub struct Encapsulation {
    /// KEM ciphertext to send to the key owner
    pub ciphertext: Vec<u8>,
    /// Shared secret known only to the two parties
    pub shared_secret: Zeroizing<[u8; SHARED_SECRET_SIZE]>,
}

/// A hybrid-encrypted message
///
/// Carries no secret material and may be sent over any channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridMessage {
    /// Kyber-1024 ciphertext
    pub kem_ciphertext: Vec<u8>,
    /// `nonce ‖ ChaCha20 ciphertext`
    pub cipher_body: Vec<u8>,
    /// Keyed SHAKE-256 tag over `cipher_body`
    pub auth_tag: [u8; TAG_SIZE],
    /// Algorithm identifier
    pub algorithm_tag: String,
    /// Creation time (Unix milliseconds)
    pub timestamp_ms: i64,
}

/// A freshly derived group secret
#[derive(ZeroizeOnDrop)]
pub struct GroupSecret {
    /// Deterministic identifier for the participant set
    #[zeroize(skip)]
    pub chat_id: String,
    /// 32-byte secret
    pub secret: [u8; SHARED_SECRET_SIZE],
    /// Participant public keys, sorted and deduplicated
    #[zeroize(skip)]
    pub participants: Vec<Vec<u8>>,
}

impl std::fmt::Debug for GroupSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSecret")
            .field("chat_id", &self.chat_id)
            .field("participants", &self.participants.len())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Session key offered by the initiator of a pairwise session
pub struct SessionKeyOffer {
    /// KEM ciphertext for the responder
    pub ciphertext: Vec<u8>,
    /// Session key (identical to what the responder derives)
    pub key: Zeroizing<[u8; kdf::DERIVED_KEY_SIZE]>,
}

// ============================================================================
// KEM PRIMITIVES
// ============================================================================

/// Generate a fresh Kyber-1024 key pair
pub fn generate_keypair() -> Result<KeyPair> {
    timed("generate_keypair", || {
        let (pk, mut sk) = kyber1024::keypair();
        let sk = WipeOnDrop(&mut sk);
        expect_kem_len(pk.as_bytes(), PUBLIC_KEY_SIZE, "public key")?;
        expect_kem_len(sk.as_bytes(), SECRET_KEY_SIZE, "secret key")?;

        Ok(KeyPair {
            public_key: pk.as_bytes().to_vec(),
            secret_key: sk.as_bytes().to_vec(),
        })
    })
}

/// Encapsulate a fresh shared secret to `public_key`
pub fn encapsulate(public_key: &[u8]) -> Result<Encapsulation> {
    validate_len(public_key, PUBLIC_KEY_SIZE, "Kyber-1024 public key")?;

    timed("encapsulate", || {
        let pk = kyber1024::PublicKey::from_bytes(public_key).map_err(|_| Error::InvalidKeyLength {
            what: "Kyber-1024 public key",
            expected: PUBLIC_KEY_SIZE,
            actual: public_key.len(),
        })?;

        let (mut ss, ct) = kyber1024::encapsulate(&pk);
        let ss = WipeOnDrop(&mut ss);
        expect_kem_len(ct.as_bytes(), CIPHERTEXT_SIZE, "ciphertext")?;
        expect_kem_len(ss.as_bytes(), SHARED_SECRET_SIZE, "shared secret")?;

        let mut shared_secret = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
        shared_secret.copy_from_slice(ss.as_bytes());

        Ok(Encapsulation {
            ciphertext: ct.as_bytes().to_vec(),
            shared_secret,
        })
    })
}

/// Recover the shared secret from a KEM ciphertext
pub fn decapsulate(secret_key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<[u8; SHARED_SECRET_SIZE]>> {
    validate_len(secret_key, SECRET_KEY_SIZE, "Kyber-1024 secret key")?;
    if ciphertext.len() != CIPHERTEXT_SIZE {
        return Err(Error::InvalidCiphertextLength {
            expected: CIPHERTEXT_SIZE,
            actual: ciphertext.len(),
        });
    }

    timed("decapsulate", || {
        let mut sk = kyber1024::SecretKey::from_bytes(secret_key)
            .map_err(|_| Error::DecapsulationFailed("secret key rejected".into()))?;
        let sk = WipeOnDrop(&mut sk);
        let ct = kyber1024::Ciphertext::from_bytes(ciphertext)
            .map_err(|_| Error::DecapsulationFailed("ciphertext rejected".into()))?;

        let mut ss = kyber1024::decapsulate(&ct, &sk);
        let ss = WipeOnDrop(&mut ss);
        expect_kem_len(ss.as_bytes(), SHARED_SECRET_SIZE, "shared secret")?;

        let mut shared_secret = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
        shared_secret.copy_from_slice(ss.as_bytes());
        Ok(shared_secret)
    })
}

// ============================================================================
// HYBRID ENCRYPTION
// ============================================================================

/// Encrypt `plaintext` for the owner of `recipient_public`
pub fn hybrid_encrypt(entropy: &EntropySource, plaintext: &[u8], recipient_public: &[u8]) -> Result<HybridMessage> {
    hybrid_encrypt_with_domain(entropy, plaintext, recipient_public, domain::HYBRID_MESSAGE)
}

/// Decrypt a message produced by [`hybrid_encrypt`]
pub fn hybrid_decrypt(message: &HybridMessage, my_secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    hybrid_decrypt_with_domain(message, my_secret, domain::HYBRID_MESSAGE)
}

/// Hybrid encryption under an explicit KDF domain
pub fn hybrid_encrypt_with_domain(
    entropy: &EntropySource,
    plaintext: &[u8],
    recipient_public: &[u8],
    kdf_domain: &[u8],
) -> Result<HybridMessage> {
    timed("hybrid_encrypt", || {
        let encapsulation = encapsulate(recipient_public)?;
        let sealed = seal::seal(entropy, &encapsulation.shared_secret[..], kdf_domain, plaintext)?;

        Ok(HybridMessage {
            kem_ciphertext: encapsulation.ciphertext,
            cipher_body: sealed.body,
            auth_tag: sealed.tag,
            algorithm_tag: ALGORITHM_TAG.to_string(),
            timestamp_ms: now_timestamp_millis(),
        })
    })
}

/// Hybrid decryption under an explicit KDF domain
pub fn hybrid_decrypt_with_domain(
    message: &HybridMessage,
    my_secret: &[u8],
    kdf_domain: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if message.algorithm_tag != ALGORITHM_TAG {
        return Err(Error::InvalidMessage(format!(
            "unsupported algorithm '{}'",
            message.algorithm_tag
        )));
    }

    timed("hybrid_decrypt", || {
        let shared_secret = decapsulate(my_secret, &message.kem_ciphertext)?;
        seal::open(&shared_secret[..], kdf_domain, &message.cipher_body, &message.auth_tag)
    })
}

// ============================================================================
// GROUP & SESSION SECRETS
// ============================================================================

/// Derive a new secret for a group of participants
///
/// The `chat_id` depends only on the set of public keys, so every ordering of
/// the same participants names the same chat. The secret itself mixes in a
/// fresh random master and differs on every call.
pub fn derive_group_secret<K: AsRef<[u8]>>(entropy: &EntropySource, public_keys: &[K]) -> Result<GroupSecret> {
    let participants = sorted_participants(public_keys)?;
    let chat_id = chat_id(&participants);

    let master = entropy.generate_symmetric_key()?;

    let mut parts: Vec<&[u8]> = Vec::with_capacity(participants.len() + 1);
    parts.push(&master[..]);
    parts.extend(participants.iter().map(|pk| pk.as_slice()));

    let mut secret = [0u8; SHARED_SECRET_SIZE];
    kdf::shake_kdf(&parts, domain::GROUP_SECRET, &mut secret);

    tracing::debug!(chat_id = %chat_id, participants = participants.len(), "Derived group secret");

    Ok(GroupSecret {
        chat_id,
        secret,
        participants,
    })
}

/// Deterministic chat identifier for a set of public keys
pub fn chat_id_for<K: AsRef<[u8]>>(public_keys: &[K]) -> Result<String> {
    Ok(chat_id(&sorted_participants(public_keys)?))
}

/// Validate, sort and deduplicate a participant set
pub fn sorted_participants<K: AsRef<[u8]>>(public_keys: &[K]) -> Result<Vec<Vec<u8>>> {
    if public_keys.is_empty() {
        return Err(Error::EmptyParticipants);
    }

    let mut participants = Vec::with_capacity(public_keys.len());
    for pk in public_keys {
        let pk = pk.as_ref();
        validate_len(pk, PUBLIC_KEY_SIZE, "Kyber-1024 public key")?;
        participants.push(pk.to_vec());
    }
    participants.sort_unstable();
    participants.dedup();
    Ok(participants)
}

/// Start a pairwise session with the owner of `their_public`
///
/// Each call encapsulates afresh, so every session key is independent.
pub fn derive_session_key(my_secret: &[u8], their_public: &[u8]) -> Result<SessionKeyOffer> {
    let my_public = KeyPair::public_from_secret(my_secret)?;
    let encapsulation = encapsulate(their_public)?;

    let salt = session_salt(&my_public, their_public);
    let key = kdf::derive_session_key(&encapsulation.shared_secret[..], &salt)?;

    Ok(SessionKeyOffer {
        ciphertext: encapsulation.ciphertext,
        key,
    })
}

/// Derive the session key offered by the owner of `their_public`
pub fn accept_session_key(
    my_secret: &[u8],
    their_public: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<[u8; kdf::DERIVED_KEY_SIZE]>> {
    validate_len(their_public, PUBLIC_KEY_SIZE, "Kyber-1024 public key")?;
    let my_public = KeyPair::public_from_secret(my_secret)?;
    let shared_secret = decapsulate(my_secret, ciphertext)?;

    let salt = session_salt(&my_public, their_public);
    kdf::derive_session_key(&shared_secret[..], &salt)
}

/// Short hex fingerprint of a public key
pub fn fingerprint(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

// ============================================================================
// HELPERS
// ============================================================================

/// Wipes a pqcrypto secret in place when dropped
///
/// pqcrypto's `SecretKey` and `SharedSecret` are `Copy` byte arrays with no
/// `Drop`, so the bindings holding them are cleared by hand on every path.
struct WipeOnDrop<'a, T: Copy>(&'a mut T);

impl<T: Copy> std::ops::Deref for WipeOnDrop<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

impl<T: Copy> Drop for WipeOnDrop<'_, T> {
    fn drop(&mut self) {
        let ptr: *mut T = &mut *self.0;
        // SAFETY: only instantiated with pqcrypto's key and secret types,
        // which are plain byte arrays: no pointers, and all-zero is a valid
        // value. `ptr` comes from a live exclusive borrow.
        unsafe { zeroize::zeroize_flat_type(ptr) }
    }
}

fn validate_len(bytes: &[u8], expected: usize, what: &'static str) -> Result<()> {
    if bytes.len() != expected {
        return Err(Error::InvalidKeyLength {
            what,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn expect_kem_len(bytes: &[u8], expected: usize, what: &str) -> Result<()> {
    if bytes.len() != expected {
        tracing::error!(what, expected, actual = bytes.len(), "KEM returned a wrong-sized buffer");
        return Err(Error::KemMisbehaving(format!(
            "{} is {} bytes, expected {}",
            what,
            bytes.len(),
            expected
        )));
    }
    Ok(())
}

fn chat_id(sorted: &[Vec<u8>]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CHAT_ID_DOMAIN);
    for pk in sorted {
        hasher.update(pk);
    }
    hex::encode(&hasher.finalize()[..CHAT_ID_BYTES])
}

fn session_salt(a: &[u8], b: &[u8]) -> [u8; 32] {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(first);
    hasher.update(second);
    hasher.finalize().into()
}

fn timed<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let watch = Stopwatch::start();
    let result = f();
    let elapsed = watch.elapsed_ms();
    if elapsed > LATENCY_BUDGET_MS {
        tracing::warn!(operation, elapsed_ms = elapsed, "KEM operation exceeded latency budget");
    }
    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pqcrypto_traits::kem::{SecretKey as _, SharedSecret as _};

    fn entropy() -> EntropySource {
        EntropySource::new().unwrap()
    }

    #[test]
    fn test_keypair_sizes_and_uniqueness() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();

        assert_eq!(a.public_key().len(), PUBLIC_KEY_SIZE);
        assert_eq!(a.secret_key().len(), SECRET_KEY_SIZE);
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.secret_key(), b.secret_key());
    }

    #[test]
    fn test_public_from_secret() {
        let kp = generate_keypair().unwrap();
        let recovered = KeyPair::public_from_secret(kp.secret_key()).unwrap();
        assert_eq!(recovered, kp.public_key());

        let rebuilt = KeyPair::from_secret_key(kp.secret_key()).unwrap();
        assert_eq!(rebuilt.public_key(), kp.public_key());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let kp = generate_keypair().unwrap();
        let debug = format!("{:?}", kp);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode(&kp.secret_key()[..8])));
    }

    #[test]
    fn test_encapsulate_decapsulate_roundtrip() {
        let kp = generate_keypair().unwrap();
        let enc = encapsulate(kp.public_key()).unwrap();

        assert_eq!(enc.ciphertext.len(), CIPHERTEXT_SIZE);

        let ss = decapsulate(kp.secret_key(), &enc.ciphertext).unwrap();
        assert_eq!(*ss, *enc.shared_secret);
    }

    #[test]
    fn test_encapsulations_are_fresh() {
        let kp = generate_keypair().unwrap();
        let a = encapsulate(kp.public_key()).unwrap();
        let b = encapsulate(kp.public_key()).unwrap();

        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(*a.shared_secret, *b.shared_secret);
    }

    #[test]
    fn test_wrong_sized_inputs() {
        let kp = generate_keypair().unwrap();

        let result = encapsulate(&kp.public_key()[..100]);
        assert!(matches!(result, Err(Error::InvalidKeyLength { expected: PUBLIC_KEY_SIZE, actual: 100, .. })));

        let result = decapsulate(&[0u8; 10], &[0u8; CIPHERTEXT_SIZE]);
        assert!(matches!(result, Err(Error::InvalidKeyLength { .. })));

        let result = decapsulate(kp.secret_key(), &[0u8; 12]);
        assert!(matches!(
            result,
            Err(Error::InvalidCiphertextLength { expected: CIPHERTEXT_SIZE, actual: 12 })
        ));
    }

    #[test]
    fn test_pqcrypto_secrets_wiped_in_place() {
        let (pk, mut sk) = kyber1024::keypair();
        let (mut ss, _ct) = kyber1024::encapsulate(&pk);
        assert!(ss.as_bytes().iter().any(|&b| b != 0));
        assert!(sk.as_bytes().iter().any(|&b| b != 0));

        {
            let guard = WipeOnDrop(&mut ss);
            assert_eq!(guard.as_bytes().len(), SHARED_SECRET_SIZE);
        }
        drop(WipeOnDrop(&mut sk));

        assert!(ss.as_bytes().iter().all(|&b| b == 0));
        assert!(sk.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_wipe_guard_on_early_return() {
        fn fails(value: &mut [u8; 32]) -> Result<()> {
            let _guard = WipeOnDrop(value);
            Err(Error::Internal("bail out".into()))
        }

        let mut value = [7u8; 32];
        assert!(fails(&mut value).is_err());
        assert_eq!(value, [0u8; 32]);
    }

    #[test]
    fn test_hybrid_roundtrip() {
        let entropy = entropy();
        let kp = generate_keypair().unwrap();

        let message = hybrid_encrypt(&entropy, b"hello", kp.public_key()).unwrap();
        assert_eq!(message.algorithm_tag, ALGORITHM_TAG);
        assert_eq!(message.kem_ciphertext.len(), CIPHERTEXT_SIZE);

        let plaintext = hybrid_decrypt(&message, kp.secret_key()).unwrap();
        assert_eq!(plaintext.as_slice(), b"hello");
    }

    #[test]
    fn test_hybrid_wrong_key_fails() {
        let entropy = entropy();
        let alice = generate_keypair().unwrap();
        let eve = generate_keypair().unwrap();

        let message = hybrid_encrypt(&entropy, b"hello", alice.public_key()).unwrap();
        let result = hybrid_decrypt(&message, eve.secret_key());

        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_hybrid_domain_separation() {
        let entropy = entropy();
        let kp = generate_keypair().unwrap();

        let memo = hybrid_encrypt_with_domain(&entropy, b"memo", kp.public_key(), domain::MEMO).unwrap();
        assert!(hybrid_decrypt(&memo, kp.secret_key()).is_err());

        let opened = hybrid_decrypt_with_domain(&memo, kp.secret_key(), domain::MEMO).unwrap();
        assert_eq!(opened.as_slice(), b"memo");
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let entropy = entropy();
        let kp = generate_keypair().unwrap();

        let mut message = hybrid_encrypt(&entropy, b"hello", kp.public_key()).unwrap();
        message.algorithm_tag = "RSA-OAEP".to_string();

        let result = hybrid_decrypt(&message, kp.secret_key());
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn test_group_secret_order_independent_id() {
        let entropy = entropy();
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        let c = generate_keypair().unwrap();

        let first = derive_group_secret(&entropy, &[a.public_key(), b.public_key(), c.public_key()]).unwrap();
        let second = derive_group_secret(&entropy, &[c.public_key(), a.public_key(), b.public_key()]).unwrap();

        assert_eq!(first.chat_id, second.chat_id);
        assert_eq!(first.participants, second.participants);
        // A fresh master is mixed into every derivation
        assert_ne!(first.secret, second.secret);
    }

    #[test]
    fn test_group_secret_validation() {
        let entropy = entropy();

        let empty: [&[u8]; 0] = [];
        assert!(matches!(
            derive_group_secret(&entropy, &empty),
            Err(Error::EmptyParticipants)
        ));

        let short: [&[u8]; 1] = [&[0u8; 32]];
        assert!(matches!(
            derive_group_secret(&entropy, &short),
            Err(Error::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn test_chat_id_differs_per_group() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        let c = generate_keypair().unwrap();

        let ab = chat_id_for(&[a.public_key(), b.public_key()]).unwrap();
        let ac = chat_id_for(&[a.public_key(), c.public_key()]).unwrap();

        assert_ne!(ab, ac);
        assert_eq!(ab.len(), CHAT_ID_BYTES * 2);
    }

    #[test]
    fn test_session_key_agreement() {
        let alice = generate_keypair().unwrap();
        let bob = generate_keypair().unwrap();

        let offer = derive_session_key(alice.secret_key(), bob.public_key()).unwrap();
        let accepted = accept_session_key(bob.secret_key(), alice.public_key(), &offer.ciphertext).unwrap();

        assert_eq!(*offer.key, *accepted);
    }

    #[test]
    fn test_session_keys_are_fresh() {
        let alice = generate_keypair().unwrap();
        let bob = generate_keypair().unwrap();

        let first = derive_session_key(alice.secret_key(), bob.public_key()).unwrap();
        let second = derive_session_key(alice.secret_key(), bob.public_key()).unwrap();

        assert_ne!(*first.key, *second.key);
    }

    #[test]
    fn test_fingerprint() {
        let kp = generate_keypair().unwrap();
        let fp = fingerprint(kp.public_key());

        assert_eq!(fp.len(), FINGERPRINT_BYTES * 2);
        assert_eq!(fp, kp.fingerprint());
    }
}
