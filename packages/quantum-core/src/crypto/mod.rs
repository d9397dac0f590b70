//! # Cryptography Module
//!
//! The primitives behind every Quantum Core operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────┐                                                  │
//! │  │  EntropySource    │  OS RNG ─► SHA-256 pool ─► ratchet per block    │
//! │  └─────────┬─────────┘                                                  │
//! │            │ nonces, keys, group masters                                │
//! │            ▼                                                            │
//! │  ┌───────────────────┐     ┌───────────────────┐                        │
//! │  │  kem (Kyber-1024) │────►│  kdf (SHAKE-256)  │                        │
//! │  │  encapsulate      │ ss  │  cipher + tag key │                        │
//! │  └───────────────────┘     └─────────┬─────────┘                        │
//! │                                      ▼                                  │
//! │                            ┌───────────────────┐                        │
//! │                            │  seal             │                        │
//! │                            │  ChaCha20 + tag   │                        │
//! │                            └───────────────────┘                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | Kyber-1024 | Post-quantum key encapsulation (NIST level 5) |
//! | ChaCha20 (RFC 8439) | Stream cipher |
//! | SHAKE-256 | Message key derivation, authentication tag |
//! | HKDF-SHA256 | Pairwise session keys |
//! | scrypt | Secure store entry keys |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: Secret keys, shared secrets and derived keys are zeroized when dropped
//! 2. **Constant-Time Operations**: ARX cipher, `subtle` tag comparison
//! 3. **No Key Reuse**: Fresh encapsulation and fresh nonce for every message

pub mod chacha20;
pub mod entropy;
pub mod kdf;
pub mod kem;
pub mod seal;

pub use entropy::{EntropySource, Quality, QualityReport};
pub use kem::{
    accept_session_key, decapsulate, derive_group_secret, derive_session_key, encapsulate, fingerprint,
    generate_keypair, hybrid_decrypt, hybrid_encrypt, Encapsulation, GroupSecret, HybridMessage, KeyPair,
    SessionKeyOffer, ALGORITHM_TAG, CIPHERTEXT_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE, SECURITY_LEVEL,
    SHARED_SECRET_SIZE,
};
pub use seal::{SealedBody, TAG_SIZE};

/// Size of symmetric keys in bytes (256 bits)
pub const SYMMETRIC_KEY_SIZE: usize = chacha20::KEY_SIZE;

/// Size of stream cipher nonces in bytes (96 bits)
pub const NONCE_SIZE: usize = chacha20::NONCE_SIZE;
