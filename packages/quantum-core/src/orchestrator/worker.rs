//! Async front end for [`QuantumCrypto`].
//!
//! KEM operations are CPU-bound and take milliseconds, too long for a UI or
//! event-loop thread. `CryptoWorker` moves each call onto tokio's blocking
//! pool and hands the result back as a future. There is no cancellation:
//! dropping the future discards the result once it is produced.

use std::sync::Arc;

use super::{ChatCiphertext, ChatSecret, QuantumCrypto, WireMessage};
use crate::crypto::{HybridMessage, KeyPair};
use crate::error::{Error, Result};

/// Cloneable async handle to a shared [`QuantumCrypto`]
#[derive(Clone, Debug)]
pub struct CryptoWorker {
    crypto: Arc<QuantumCrypto>,
}

impl CryptoWorker {
    /// Wrap a shared context
    pub fn new(crypto: Arc<QuantumCrypto>) -> Self {
        Self { crypto }
    }

    /// The underlying context
    pub fn crypto(&self) -> &Arc<QuantumCrypto> {
        &self.crypto
    }

    /// Run the self-test off the calling thread
    pub async fn initialize(&self) -> Result<()> {
        self.run(|crypto| crypto.initialize()).await
    }

    /// See [`QuantumCrypto::generate_keypair`]
    pub async fn generate_keypair(&self) -> Result<KeyPair> {
        self.run(|crypto| crypto.generate_keypair()).await
    }

    /// See [`QuantumCrypto::encrypt_message`]
    pub async fn encrypt_message(&self, text: String, recipient_public: Vec<u8>) -> Result<HybridMessage> {
        self.run(move |crypto| crypto.encrypt_message(&text, &recipient_public))
            .await
    }

    /// See [`QuantumCrypto::decrypt_message`]
    pub async fn decrypt_message(&self, message: HybridMessage, my_secret: Vec<u8>) -> Result<String> {
        let my_secret = zeroize::Zeroizing::new(my_secret);
        self.run(move |crypto| crypto.decrypt_message(&message, &my_secret))
            .await
    }

    /// See [`QuantumCrypto::generate_chat_secret`]
    pub async fn generate_chat_secret(&self, participant_public_keys: Vec<Vec<u8>>) -> Result<ChatSecret> {
        self.run(move |crypto| crypto.generate_chat_secret(&participant_public_keys))
            .await
    }

    /// See [`QuantumCrypto::encrypt_chat_message`]
    pub async fn encrypt_chat_message(
        &self,
        text: String,
        secret: ChatSecret,
        sender_public: Vec<u8>,
    ) -> Result<ChatCiphertext> {
        self.run(move |crypto| crypto.encrypt_chat_message(&text, &secret, &sender_public))
            .await
    }

    /// See [`QuantumCrypto::decrypt_chat_message`]
    pub async fn decrypt_chat_message(&self, message: ChatCiphertext, secret: ChatSecret) -> Result<String> {
        self.run(move |crypto| crypto.decrypt_chat_message(&message, &secret))
            .await
    }

    /// See [`QuantumCrypto::encrypt_memo`]
    pub async fn encrypt_memo(&self, memo: String, recipient_public: Vec<u8>) -> Result<WireMessage> {
        self.run(move |crypto| crypto.encrypt_memo(&memo, &recipient_public))
            .await
    }

    /// See [`QuantumCrypto::decrypt_memo`]
    pub async fn decrypt_memo(&self, wire: WireMessage, my_secret: Vec<u8>) -> Result<String> {
        let my_secret = zeroize::Zeroizing::new(my_secret);
        self.run(move |crypto| crypto.decrypt_memo(&wire, &my_secret))
            .await
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&QuantumCrypto) -> Result<T> + Send + 'static,
    {
        let crypto = Arc::clone(&self.crypto);
        tokio::task::spawn_blocking(move || f(crypto.as_ref()))
            .await
            .map_err(|e| Error::Internal(format!("crypto worker task failed: {}", e)))?
    }
}
