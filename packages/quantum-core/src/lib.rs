//! # Quantum Core
//!
//! Post-quantum hybrid cryptography for a messenger and wallet: Kyber-1024
//! key encapsulation, a ChaCha20 stream cipher, a hardened random number
//! generator and an ephemeral encrypted store, composed into message, chat
//! and memo encryption.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        QUANTUM CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │  Orchestrator (QuantumCrypto)                                     │  │
//! │  │  - self-test on first use      - latency telemetry                │  │
//! │  │  - messages / chats / memos    - async worker front end           │  │
//! │  └──────┬──────────────────┬──────────────────────┬──────────────────┘  │
//! │         │                  │                      │                     │
//! │         ▼                  ▼                      ▼                     │
//! │  ┌─────────────┐   ┌──────────────┐      ┌──────────────────┐           │
//! │  │  KEM        │   │ Stream       │      │  Secure Store    │           │
//! │  │  Kyber-1024 │──►│ Cipher       │◄─────│  scrypt per entry│           │
//! │  │  + hybrid   │   │ ChaCha20+tag │      │  TTL expiry      │           │
//! │  └──────┬──────┘   └──────┬───────┘      └────────┬─────────┘           │
//! │         │                 │                       │                     │
//! │         └─────────────────┴───────────┬───────────┘                     │
//! │                                       ▼                                 │
//! │                            ┌──────────────────┐                         │
//! │                            │  Entropy Source  │                         │
//! │                            │  OS RNG + pool   │                         │
//! │                            └──────────────────┘                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Entropy, stream cipher, KDFs, KEM and hybrid encryption
//! - [`storage`] - Ephemeral encrypted secure store
//! - [`orchestrator`] - The `QuantumCrypto` context, telemetry, wire format
//! - [`time`] - Platform time, chosen at compile time
//!
//! ## Usage
//!
//! ```ignore
//! use quantum_core::{CoreConfig, QuantumCrypto};
//!
//! let crypto = QuantumCrypto::new(CoreConfig::default())?;
//! let bob = crypto.generate_keypair()?;
//!
//! let message = crypto.encrypt_message("hello", bob.public_key())?;
//! assert_eq!(crypto.decrypt_message(&message, bob.secret_key())?, "hello");
//! ```
//!
//! ## Platform Support
//!
//! | Platform | Randomness | Clock | Async worker |
//! |----------|------------|-------|--------------|
//! | iOS / Android / Desktop | OS RNG | chrono + `Instant` | tokio blocking pool |
//! | Web (wasm32) | `crypto.getRandomValues` | `Date.now()` | not available |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod orchestrator;
pub mod storage;
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{EntropySource, HybridMessage, KeyPair};
pub use error::{Error, ErrorCategory, Result};
pub use orchestrator::{BenchmarkReport, ChatCiphertext, ChatSecret, Operation, QuantumCrypto, WireMessage};
#[cfg(not(target_arch = "wasm32"))]
pub use orchestrator::CryptoWorker;
pub use storage::{SecureStore, StoreConfig};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for a [`QuantumCrypto`] context
///
/// Built once at start-up; the context never changes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Secure store KDF cost and default TTL
    pub store: StoreConfig,
    /// Average latency above which a warning is logged
    pub latency_budget_ms: f64,
    /// Samples kept per operation for latency stats
    pub telemetry_window: usize,
    /// How long cached chat secrets live
    pub chat_secret_ttl_minutes: u64,
    /// Largest memo `encrypt_memo` accepts, in bytes
    pub max_memo_len: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            latency_budget_ms: 20.0,
            telemetry_window: 100,
            chat_secret_ttl_minutes: 60,
            max_memo_len: 512,
        }
    }
}

impl CoreConfig {
    /// Defaults with a cheap secure-store KDF
    pub fn for_testing() -> Self {
        Self {
            store: StoreConfig::fast(),
            ..Self::default()
        }
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Quantum Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for bug reports and the benchmark header
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        kem: crypto::ALGORITHM_TAG,
        security: crypto::SECURITY_LEVEL,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Operating system the crate was compiled for
    pub os: &'static str,
    /// CPU architecture (`wasm32` in the browser)
    pub arch: &'static str,
    /// Hybrid algorithm identifier
    pub kem: &'static str,
    /// Security level label
    pub security: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
        assert_eq!(info.kem, "Kyber1024-ChaCha20");
    }

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.latency_budget_ms, 20.0);
        assert_eq!(config.telemetry_window, 100);
        assert_eq!(config.store.scrypt_log_n, 15);
        assert_eq!(config.store.scrypt_r, 8);
        assert_eq!(config.store.scrypt_p, 1);
        assert!(CoreConfig::for_testing().store.scrypt_log_n < config.store.scrypt_log_n);
    }
}
