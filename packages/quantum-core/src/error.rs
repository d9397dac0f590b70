//! # Error Handling
//!
//! This module provides the error type shared by every component of Quantum Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Validation Errors (caller-fixable, never retried)                 │
//! │  │   ├── InvalidKeyLength        - Key buffer has the wrong size       │
//! │  │   ├── InvalidNonceLength      - Nonce buffer has the wrong size     │
//! │  │   ├── InvalidCiphertextLength - KEM ciphertext has the wrong size   │
//! │  │   ├── InvalidMessage          - Malformed HybridMessage / envelope  │
//! │  │   ├── MessageTooLarge         - Input exceeds a hard limit          │
//! │  │   └── EmptyParticipants       - Group derivation without members    │
//! │  │                                                                      │
//! │  ├── Environment Errors (fatal, refuse to initialize)                  │
//! │  │   ├── EntropyUnavailable      - No strong OS random source          │
//! │  │   ├── EntropyQuality          - Output kept failing quality checks  │
//! │  │   ├── KemMisbehaving          - KEM returned wrong-sized buffers    │
//! │  │   ├── SelfTestFailed          - Start-up self-test failed           │
//! │  │   └── NotInitialized          - Context was shut down               │
//! │  │                                                                      │
//! │  ├── Crypto Errors (this operation failed, nothing substituted)        │
//! │  │   ├── DecapsulationFailed     - KEM could not open the ciphertext   │
//! │  │   ├── DecryptionFailed        - Tag mismatch / wrong key            │
//! │  │   └── KeyDerivationFailed     - KDF rejected its parameters         │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── StorageWriteError       - Entry could not be stored           │
//! │  │   └── StorageCorrupted        - Stored entry failed to open         │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── Internal                                                      │
//! │      ├── SerializationError                                            │
//! │      └── DeserializationError                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expired secure-store entries are not errors: `retrieve` returns `Ok(None)`
//! exactly as it does for a key that was never stored.

use thiserror::Error;

/// Result type alias for Quantum Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Quantum Core
///
/// Every failure surfaces to the immediate caller with a specific reason.
/// Nothing in this crate degrades to an insecure success.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors (100-199)
    // ========================================================================

    /// A key buffer did not have the size required by its algorithm
    #[error("Invalid key length for {what}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Which key was being validated
        what: &'static str,
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// A nonce buffer did not have the size required by the stream cipher
    #[error("Invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// A KEM ciphertext did not have the size required by the parameter set
    #[error("Invalid KEM ciphertext length: expected {expected} bytes, got {actual}")]
    InvalidCiphertextLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// A hybrid message or wire envelope was malformed
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Input exceeded a hard size limit
    #[error("Message too large: {0}")]
    MessageTooLarge(String),

    /// A group derivation was requested without participants
    #[error("At least one participant public key is required")]
    EmptyParticipants,

    // ========================================================================
    // Environment Errors (200-299)
    // ========================================================================

    /// The operating system random source is unavailable
    #[error("No strong random source available: {0}")]
    EntropyUnavailable(String),

    /// Generated key material repeatedly failed the quality check
    #[error("Entropy quality check failed after {attempts} attempts")]
    EntropyQuality {
        /// Number of generation attempts made
        attempts: u32,
    },

    /// The KEM implementation produced buffers of an unexpected size
    #[error("KEM implementation misbehaving: {0}")]
    KemMisbehaving(String),

    /// The start-up self-test failed; the context will not become ready
    #[error("Self-test failed: {0}")]
    SelfTestFailed(String),

    /// The context has been shut down
    #[error("Quantum Core is not initialized or has been shut down.")]
    NotInitialized,

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Decapsulation failed
    #[error("Decapsulation failed: {0}")]
    DecapsulationFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Failed to write to the secure store
    #[error("Failed to write to secure store: {0}")]
    StorageWriteError(String),

    /// A stored entry could not be opened with its derived key
    #[error("Secure store entry corrupted: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Coarse classification used by callers to decide what to do with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied bad input
    Validation,
    /// The platform or a dependency is unusable
    Environment,
    /// A single cryptographic operation failed
    Crypto,
    /// Secure store failure
    Storage,
    /// Bug or serialization problem
    Internal,
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Validation
    /// - 200-299: Environment
    /// - 300-399: Crypto
    /// - 400-499: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Validation (100-199)
            Error::InvalidKeyLength { .. } => 100,
            Error::InvalidNonceLength { .. } => 101,
            Error::InvalidCiphertextLength { .. } => 102,
            Error::InvalidMessage(_) => 103,
            Error::MessageTooLarge(_) => 104,
            Error::EmptyParticipants => 105,

            // Environment (200-299)
            Error::EntropyUnavailable(_) => 200,
            Error::EntropyQuality { .. } => 201,
            Error::KemMisbehaving(_) => 202,
            Error::SelfTestFailed(_) => 203,
            Error::NotInitialized => 204,

            // Crypto (300-399)
            Error::DecapsulationFailed(_) => 300,
            Error::DecryptionFailed(_) => 301,
            Error::KeyDerivationFailed(_) => 303,

            // Storage (400-499)
            Error::StorageWriteError(_) => 400,
            Error::StorageCorrupted(_) => 401,

            // Internal (900-999)
            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
            Error::DeserializationError(_) => 902,
        }
    }

    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            100..=199 => ErrorCategory::Validation,
            200..=299 => ErrorCategory::Environment,
            300..=399 => ErrorCategory::Crypto,
            400..=499 => ErrorCategory::Storage,
            _ => ErrorCategory::Internal,
        }
    }

    /// Check if the caller can fix this error by changing its input
    pub fn is_caller_fixable(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Check if this error means the core cannot be used at all
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Environment
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::DeserializationError(err.to_string())
        } else {
            Error::SerializationError(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidMessage(format!("invalid base64: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================
