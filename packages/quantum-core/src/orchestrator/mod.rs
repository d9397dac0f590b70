//! # Orchestrator
//!
//! [`QuantumCrypto`] is the context object the rest of the application holds.
//! It owns the entropy source, the secure store and the latency telemetry,
//! and exposes message, chat and memo encryption on top of the primitives.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     QUANTUM CRYPTO LIFECYCLE                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. QuantumCrypto::new(config)                                          │
//! │        ├─► EntropySource::new()     (fails without an OS RNG)           │
//! │        └─► SecureStore::new()       (fresh master key + session id)     │
//! │                                                                         │
//! │  2. First operation (or explicit initialize())                          │
//! │        └─► self-test, once:                                             │
//! │              entropy quality ─► cipher round trip ─►                    │
//! │              KEM round trip ─► store round trip                         │
//! │            failure is sticky: every later call is SelfTestFailed        │
//! │                                                                         │
//! │  3. Operations (each timed into a rolling window)                       │
//! │                                                                         │
//! │  4. shutdown()                                                          │
//! │        └─► secure store wiped, every later call is NotInitialized       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Share one instance behind an `Arc`; every method takes `&self`.

pub mod benchmark;
pub mod chat;
pub mod telemetry;
pub mod wire;
#[cfg(not(target_arch = "wasm32"))]
pub mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::kdf::{domain, DERIVED_KEY_SIZE};
use crate::crypto::{chacha20, kem, seal, EntropySource, HybridMessage, KeyPair, Quality, SessionKeyOffer};
use crate::error::{Error, Result};
use crate::storage::{keys, SecureStore};
use crate::time::{now_timestamp_millis, Stopwatch};
use crate::CoreConfig;

pub use benchmark::BenchmarkReport;
pub use chat::{ChatCiphertext, ChatSecret};
pub use telemetry::{LatencyStats, Operation, PerformanceStats, Telemetry};
pub use wire::WireMessage;
#[cfg(not(target_arch = "wasm32"))]
pub use worker::CryptoWorker;

const SELF_TEST_BYTES: usize = 4096;
const SELF_TEST_SAMPLE: &[u8] = b"quantum-core self-test sample";

/// Post-quantum hybrid crypto context
pub struct QuantumCrypto {
    config: CoreConfig,
    entropy: Arc<EntropySource>,
    store: SecureStore,
    telemetry: Telemetry,
    // Held from chat cache lookup to insert
    chat_lock: Mutex<()>,
    // Err holds the reason the self-test failed
    self_test: OnceCell<std::result::Result<(), String>>,
    shut_down: AtomicBool,
}

impl QuantumCrypto {
    /// Create a context
    ///
    /// Fails with an environment error when no strong random source exists.
    pub fn new(config: CoreConfig) -> Result<Self> {
        tracing::info!("Initializing Quantum Core v{}", crate::version());

        let entropy = Arc::new(EntropySource::new()?);
        let store = SecureStore::new(Arc::clone(&entropy), config.store)?;
        let telemetry = Telemetry::new(config.telemetry_window, config.latency_budget_ms);

        Ok(Self {
            config,
            entropy,
            store,
            telemetry,
            chat_lock: Mutex::new(()),
            self_test: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Run the self-test now instead of on first use
    pub fn initialize(&self) -> Result<()> {
        self.ensure_ready()
    }

    /// Whether the self-test passed and the context is not shut down
    pub fn is_ready(&self) -> bool {
        !self.shut_down.load(Ordering::Acquire) && matches!(self.self_test.get(), Some(Ok(())))
    }

    /// The configuration this context was built with
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The shared entropy source
    pub fn entropy(&self) -> &EntropySource {
        &self.entropy
    }

    /// The session's secure store
    pub fn secure_store(&self) -> &SecureStore {
        &self.store
    }

    // ========================================================================
    // DIRECT MESSAGES
    // ========================================================================

    /// Generate a Kyber-1024 key pair
    pub fn generate_keypair(&self) -> Result<KeyPair> {
        self.ensure_ready()?;
        self.timed(Operation::KeyGeneration, kem::generate_keypair)
    }

    /// Encrypt a text message for the owner of `recipient_public`
    pub fn encrypt_message(&self, text: &str, recipient_public: &[u8]) -> Result<HybridMessage> {
        self.ensure_ready()?;
        self.timed(Operation::Encryption, || {
            kem::hybrid_encrypt(&self.entropy, text.as_bytes(), recipient_public)
        })
    }

    /// Decrypt a text message with `my_secret`
    pub fn decrypt_message(&self, message: &HybridMessage, my_secret: &[u8]) -> Result<String> {
        self.ensure_ready()?;
        self.timed(Operation::Decryption, || {
            let plaintext = kem::hybrid_decrypt(message, my_secret)?;
            into_text(plaintext)
        })
    }

    // ========================================================================
    // CHATS
    // ========================================================================

    /// Get the secret for a participant set, deriving and caching it on first use
    ///
    /// While the cached copy is alive every call returns the same secret,
    /// including calls racing on other threads. After it expires a new,
    /// different secret is derived.
    pub fn generate_chat_secret<K: AsRef<[u8]>>(&self, participant_public_keys: &[K]) -> Result<ChatSecret> {
        self.ensure_ready()?;
        self.timed(Operation::ChatSecret, || {
            let participants = kem::sorted_participants(participant_public_keys)?;
            let chat_id = kem::chat_id_for(&participants)?;
            let cache_key = keys::chat_secret(&chat_id);

            let _guard = self.chat_lock.lock();
            if let Some(cached) = self.store.retrieve(&cache_key)? {
                tracing::debug!(chat_id = %chat_id, "Using cached chat secret");
                return ChatSecret::from_cache(chat_id, &participants, &cached);
            }

            let group = kem::derive_group_secret(&self.entropy, &participants)?;
            let derived = ChatSecret::from_group(&group, now_timestamp_millis());
            self.store
                .store(&cache_key, &derived.cache_bytes(), self.config.chat_secret_ttl_minutes)?;
            tracing::info!(
                chat_id = %derived.chat_id,
                participants = derived.participants.len(),
                "Created chat secret"
            );
            Ok(derived)
        })
    }

    /// Encrypt a chat message from the holder of `sender_public`
    pub fn encrypt_chat_message(&self, text: &str, secret: &ChatSecret, sender_public: &[u8]) -> Result<ChatCiphertext> {
        self.ensure_ready()?;
        if !secret.has_participant(sender_public) {
            return Err(Error::InvalidMessage("sender is not a participant of this chat".into()));
        }

        self.timed(Operation::ChatEncryption, || {
            let key = self.resolve_chat_secret(secret)?;
            let sealed = seal::seal(&self.entropy, &key[..], domain::CHAT_MESSAGE, text.as_bytes())?;

            Ok(ChatCiphertext {
                chat_id: secret.chat_id.clone(),
                cipher_bytes: sealed.body,
                auth_tag: sealed.tag,
                sender_id: kem::fingerprint(sender_public),
                timestamp_ms: now_timestamp_millis(),
            })
        })
    }

    /// Decrypt a chat message
    pub fn decrypt_chat_message(&self, message: &ChatCiphertext, secret: &ChatSecret) -> Result<String> {
        self.ensure_ready()?;
        if message.chat_id != secret.chat_id {
            return Err(Error::InvalidMessage(format!(
                "message belongs to chat {}, not {}",
                message.chat_id, secret.chat_id
            )));
        }

        self.timed(Operation::ChatDecryption, || {
            let key = self.resolve_chat_secret(secret)?;
            let plaintext = seal::open(&key[..], domain::CHAT_MESSAGE, &message.cipher_bytes, &message.auth_tag)?;
            into_text(plaintext)
        })
    }

    // ========================================================================
    // MEMOS
    // ========================================================================

    /// Encrypt a short wallet memo into a wire envelope
    pub fn encrypt_memo(&self, memo: &str, recipient_public: &[u8]) -> Result<WireMessage> {
        self.ensure_ready()?;
        if memo.len() > self.config.max_memo_len {
            return Err(Error::MessageTooLarge(format!(
                "memo is {} bytes, limit is {}",
                memo.len(),
                self.config.max_memo_len
            )));
        }

        let watch = Stopwatch::start();
        let message = self.timed(Operation::MemoEncryption, || {
            kem::hybrid_encrypt_with_domain(&self.entropy, memo.as_bytes(), recipient_public, domain::MEMO)
        })?;
        Ok(WireMessage::from_hybrid(&message, watch.elapsed_ms()))
    }

    /// Decrypt a memo envelope
    pub fn decrypt_memo(&self, wire: &WireMessage, my_secret: &[u8]) -> Result<String> {
        self.ensure_ready()?;
        let message = wire.to_hybrid()?;
        self.timed(Operation::MemoDecryption, || {
            let plaintext = kem::hybrid_decrypt_with_domain(&message, my_secret, domain::MEMO)?;
            into_text(plaintext)
        })
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Offer a fresh session key to the owner of `their_public`
    pub fn derive_session_key(&self, my_secret: &[u8], their_public: &[u8]) -> Result<SessionKeyOffer> {
        self.ensure_ready()?;
        self.timed(Operation::SessionKey, || kem::derive_session_key(my_secret, their_public))
    }

    /// Accept a session key offered by the owner of `their_public`
    pub fn accept_session_key(
        &self,
        my_secret: &[u8],
        their_public: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
        self.ensure_ready()?;
        self.timed(Operation::SessionKey, || {
            kem::accept_session_key(my_secret, their_public, ciphertext)
        })
    }

    // ========================================================================
    // TELEMETRY
    // ========================================================================

    /// Latency summaries for every operation used so far
    pub fn performance_stats(&self) -> PerformanceStats {
        self.telemetry.snapshot()
    }

    /// Measure the KEM and hybrid paths
    pub fn run_benchmark(&self, iterations: usize) -> Result<BenchmarkReport> {
        self.ensure_ready()?;
        benchmark::run(&self.entropy, iterations)
    }

    /// Wipe the secure store and refuse further work
    pub fn shutdown(&self) {
        tracing::info!("Shutting down Quantum Core");
        self.shut_down.store(true, Ordering::Release);
        self.store.close();
        tracing::info!("Quantum Core shutdown complete");
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn ensure_ready(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(Error::NotInitialized);
        }

        let outcome = self.self_test.get_or_init(|| {
            let watch = Stopwatch::start();
            match self.run_self_test() {
                Ok(()) => {
                    tracing::info!(elapsed_ms = watch.elapsed_ms(), "Self-test passed");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(error = %e, "Self-test failed; Quantum Core will not become ready");
                    Err(e.to_string())
                }
            }
        });

        outcome.clone().map_err(Error::SelfTestFailed)
    }

    fn run_self_test(&self) -> Result<()> {
        let sample = self.entropy.generate_bytes(SELF_TEST_BYTES)?;
        let report = EntropySource::test_quality(&sample);
        if report.label == Quality::Poor {
            return Err(Error::EntropyQuality { attempts: 1 });
        }

        let key = self.entropy.generate_symmetric_key()?;
        let sealed = chacha20::encrypt(&self.entropy, &key[..], SELF_TEST_SAMPLE)?;
        if chacha20::decrypt(&key[..], &sealed)?.as_slice() != SELF_TEST_SAMPLE {
            return Err(Error::Internal("stream cipher round trip mismatch".into()));
        }

        let keypair = kem::generate_keypair()?;
        let encapsulation = kem::encapsulate(keypair.public_key())?;
        let shared = kem::decapsulate(keypair.secret_key(), &encapsulation.ciphertext)?;
        if *shared != *encapsulation.shared_secret {
            return Err(Error::KemMisbehaving("encapsulate/decapsulate secrets differ".into()));
        }

        self.store.store(keys::SELF_TEST, SELF_TEST_SAMPLE, 1)?;
        let restored = self.store.retrieve(keys::SELF_TEST)?;
        self.store.remove(keys::SELF_TEST);
        if restored.as_deref().map(|v| v.as_slice()) != Some(SELF_TEST_SAMPLE) {
            return Err(Error::Internal("secure store round trip mismatch".into()));
        }

        Ok(())
    }

    /// The key for a chat operation: always the caller's secret
    ///
    /// The cached copy is checked against it in constant time. A mismatch
    /// means another derivation for the same chat and is only logged; a miss
    /// caches the supplied secret.
    fn resolve_chat_secret(&self, supplied: &ChatSecret) -> Result<Zeroizing<[u8; kem::SHARED_SECRET_SIZE]>> {
        let cache_key = keys::chat_secret(&supplied.chat_id);
        let _guard = self.chat_lock.lock();
        match self.store.retrieve(&cache_key)? {
            Some(cached) => {
                let (secret, _) = chat::parse_cached(&cached)?;
                let secret = Zeroizing::new(secret);
                if !bool::from(secret[..].ct_eq(&supplied.shared_secret[..])) {
                    tracing::warn!(
                        chat_id = %supplied.chat_id,
                        "Supplied chat secret differs from cached copy; using supplied secret"
                    );
                }
            }
            None => {
                tracing::warn!(chat_id = %supplied.chat_id, "Chat secret cache miss; using supplied secret");
                self.store
                    .store(&cache_key, &supplied.cache_bytes(), self.config.chat_secret_ttl_minutes)?;
            }
        }
        Ok(Zeroizing::new(supplied.shared_secret))
    }

    fn timed<T>(&self, op: Operation, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let watch = Stopwatch::start();
        let result = f()?;
        self.telemetry.record(op, watch.elapsed_ms());
        Ok(result)
    }
}

impl std::fmt::Debug for QuantumCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuantumCrypto")
            .field("ready", &self.is_ready())
            .field("store", &self.store)
            .finish()
    }
}

fn into_text(plaintext: Zeroizing<Vec<u8>>) -> Result<String> {
    String::from_utf8(plaintext.to_vec())
        .map_err(|_| Error::InvalidMessage("decrypted payload is not UTF-8 text".into()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> QuantumCrypto {
        QuantumCrypto::new(CoreConfig::for_testing()).unwrap()
    }

    #[test]
    fn test_self_test_runs_once() {
        let qc = crypto();
        assert!(!qc.is_ready());

        qc.initialize().unwrap();
        assert!(qc.is_ready());
        assert!(qc.initialize().is_ok());
        // The self-test sample is not left behind
        assert!(!qc.secure_store().contains(keys::SELF_TEST));
    }

    #[test]
    fn test_message_roundtrip() {
        let qc = crypto();
        let bob = qc.generate_keypair().unwrap();

        let message = qc.encrypt_message("hello", bob.public_key()).unwrap();
        assert_eq!(qc.decrypt_message(&message, bob.secret_key()).unwrap(), "hello");
    }

    #[test]
    fn test_decrypt_never_returns_ciphertext() {
        let qc = crypto();
        let bob = qc.generate_keypair().unwrap();
        let eve = qc.generate_keypair().unwrap();

        let message = qc.encrypt_message("hello", bob.public_key()).unwrap();
        let err = qc.decrypt_message(&message, eve.secret_key()).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed(_)));
    }

    #[test]
    fn test_chat_secret_is_cached() {
        let qc = crypto();
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();

        let first = qc.generate_chat_secret(&[a.public_key(), b.public_key()]).unwrap();
        let second = qc.generate_chat_secret(&[b.public_key(), a.public_key()]).unwrap();

        assert_eq!(first.chat_id, second.chat_id);
        assert_eq!(first.shared_secret, second.shared_secret);
        assert_eq!(first.created_at_ms, second.created_at_ms);
    }

    #[test]
    fn test_chat_roundtrip() {
        let qc = crypto();
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();
        let secret = qc.generate_chat_secret(&[a.public_key(), b.public_key()]).unwrap();

        let message = qc.encrypt_chat_message("hi all", &secret, a.public_key()).unwrap();
        assert_eq!(message.sender_id, a.fingerprint());
        assert_eq!(qc.decrypt_chat_message(&message, &secret).unwrap(), "hi all");
    }

    #[test]
    fn test_chat_sender_must_be_participant() {
        let qc = crypto();
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();
        let outsider = qc.generate_keypair().unwrap();
        let secret = qc.generate_chat_secret(&[a.public_key(), b.public_key()]).unwrap();

        let result = qc.encrypt_chat_message("hi", &secret, outsider.public_key());
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn test_chat_cache_miss_falls_back_to_supplied() {
        let qc = crypto();
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();
        let secret = qc.generate_chat_secret(&[a.public_key(), b.public_key()]).unwrap();

        qc.secure_store().remove(&keys::chat_secret(&secret.chat_id));

        let message = qc.encrypt_chat_message("still works", &secret, b.public_key()).unwrap();
        assert_eq!(qc.decrypt_chat_message(&message, &secret).unwrap(), "still works");
    }

    #[test]
    fn test_chat_secret_survives_other_devices_derivation() {
        let alice_device = crypto();
        let bob_device = crypto();
        let a = alice_device.generate_keypair().unwrap();
        let b = alice_device.generate_keypair().unwrap();
        let members = [a.public_key(), b.public_key()];

        let shared = alice_device.generate_chat_secret(&members).unwrap();
        let message = alice_device.encrypt_chat_message("hi bob", &shared, a.public_key()).unwrap();

        // Bob's device derives (and caches) its own secret for the same chat
        let local = bob_device.generate_chat_secret(&members).unwrap();
        assert_eq!(local.chat_id, shared.chat_id);
        assert_ne!(local.shared_secret, shared.shared_secret);

        assert_eq!(bob_device.decrypt_chat_message(&message, &shared).unwrap(), "hi bob");
    }

    #[test]
    fn test_chat_encrypts_under_supplied_secret() {
        let sender = crypto();
        let receiver = crypto();
        let a = sender.generate_keypair().unwrap();
        let b = sender.generate_keypair().unwrap();
        let members = [a.public_key(), b.public_key()];

        let supplied = receiver.generate_chat_secret(&members).unwrap();
        sender.generate_chat_secret(&members).unwrap();

        let message = sender.encrypt_chat_message("sealed", &supplied, b.public_key()).unwrap();
        let fresh = crypto();
        assert_eq!(fresh.decrypt_chat_message(&message, &supplied).unwrap(), "sealed");
    }

    #[test]
    fn test_concurrent_chat_secret_creation() {
        let qc = Arc::new(crypto());
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();
        let members = vec![a.public_key().to_vec(), b.public_key().to_vec()];

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let qc = Arc::clone(&qc);
                let members = members.clone();
                std::thread::spawn(move || qc.generate_chat_secret(&members).unwrap())
            })
            .collect();
        let secrets: Vec<ChatSecret> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for secret in &secrets[1..] {
            assert_eq!(secret.shared_secret, secrets[0].shared_secret);
            assert_eq!(secret.created_at_ms, secrets[0].created_at_ms);
        }
    }

    #[test]
    fn test_chat_message_for_other_chat_rejected() {
        let qc = crypto();
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();
        let c = qc.generate_keypair().unwrap();

        let ab = qc.generate_chat_secret(&[a.public_key(), b.public_key()]).unwrap();
        let ac = qc.generate_chat_secret(&[a.public_key(), c.public_key()]).unwrap();

        let message = qc.encrypt_chat_message("for ab", &ab, a.public_key()).unwrap();
        assert!(matches!(
            qc.decrypt_chat_message(&message, &ac),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_memo_roundtrip_and_limit() {
        let qc = crypto();
        let bob = qc.generate_keypair().unwrap();

        let wire = qc.encrypt_memo("rent for march", bob.public_key()).unwrap();
        assert_eq!(qc.decrypt_memo(&wire, bob.secret_key()).unwrap(), "rent for march");

        let long = "x".repeat(qc.config().max_memo_len + 1);
        assert!(matches!(
            qc.encrypt_memo(&long, bob.public_key()),
            Err(Error::MessageTooLarge(_))
        ));
    }

    #[test]
    fn test_memo_is_not_a_message() {
        let qc = crypto();
        let bob = qc.generate_keypair().unwrap();

        let wire = qc.encrypt_memo("memo", bob.public_key()).unwrap();
        let hybrid = wire.to_hybrid().unwrap();
        assert!(qc.decrypt_message(&hybrid, bob.secret_key()).is_err());
    }

    #[test]
    fn test_session_keys_through_context() {
        let qc = crypto();
        let a = qc.generate_keypair().unwrap();
        let b = qc.generate_keypair().unwrap();

        let offer = qc.derive_session_key(a.secret_key(), b.public_key()).unwrap();
        let accepted = qc
            .accept_session_key(b.secret_key(), a.public_key(), &offer.ciphertext)
            .unwrap();
        assert_eq!(*offer.key, *accepted);
    }

    #[test]
    fn test_performance_stats_recorded() {
        let qc = crypto();
        let bob = qc.generate_keypair().unwrap();
        let message = qc.encrypt_message("x", bob.public_key()).unwrap();
        qc.decrypt_message(&message, bob.secret_key()).unwrap();

        let stats = qc.performance_stats();
        for op in [Operation::KeyGeneration, Operation::Encryption, Operation::Decryption] {
            let s = stats.get(&op).unwrap();
            assert_eq!(s.count, 1);
            assert!(s.min_ms <= s.avg_ms && s.avg_ms <= s.max_ms);
        }
    }

    #[test]
    fn test_failed_operations_not_recorded() {
        let qc = crypto();
        assert!(qc.encrypt_message("x", &[0u8; 3]).is_err());
        assert!(!qc.performance_stats().contains_key(&Operation::Encryption));
    }

    #[test]
    fn test_shutdown_refuses_work() {
        let qc = crypto();
        qc.initialize().unwrap();
        qc.secure_store().store("k", b"v", 5).unwrap();

        qc.shutdown();

        assert!(!qc.is_ready());
        assert!(matches!(qc.generate_keypair(), Err(Error::NotInitialized)));
        assert!(qc.secure_store().retrieve("k").unwrap().is_none());
    }

    #[test]
    fn test_sticky_self_test_failure() {
        let qc = crypto();
        qc.self_test
            .set(Err("entropy quality".into()))
            .unwrap();

        assert!(!qc.is_ready());
        for _ in 0..2 {
            assert!(matches!(qc.generate_keypair(), Err(Error::SelfTestFailed(_))));
        }
    }
}
