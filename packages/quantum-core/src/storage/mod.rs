//! # Storage Module
//!
//! Memory-resident storage for short-lived secrets.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SecureStore (in-memory only)                                   │   │
//! │  │  ─────────────────────────────                                   │   │
//! │  │                                                                 │   │
//! │  │  Stored: cached chat secrets, private keys in active use       │   │
//! │  │  Keyed by: scrypt(master ‖ name ‖ session id, random salt)     │   │
//! │  │  Lifetime: TTL per entry, whole session at most                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Durable storage is the caller's concern. Nothing here survives a     │
//! │  process restart.                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod secure_store;

pub use secure_store::{SecureStore, StoreConfig, StoredEntry, SALT_SIZE};

/// Key names used by the orchestrator
pub mod keys {
    /// Prefix for cached chat secrets (`chat.secret.<chat_id>`)
    pub const CHAT_SECRET_PREFIX: &str = "chat.secret.";

    /// Key used by the start-up self-test
    pub const SELF_TEST: &str = "quantum.self_test";

    /// Store key for a chat's cached secret
    pub fn chat_secret(chat_id: &str) -> String {
        format!("{}{}", CHAT_SECRET_PREFIX, chat_id)
    }
}
