//! # Hybrid Encryption Demo
//!
//! Walks through direct messages, a group chat and a wallet memo using one
//! `QuantumCrypto` context.
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=quantum_core=debug cargo run --example hybrid_demo
//! ```

use quantum_core::{CoreConfig, QuantumCrypto, WireMessage};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quantum_core=info")))
        .init();

    println!("=== Quantum Core: Hybrid Encryption Demo ===\n");

    let crypto = QuantumCrypto::new(CoreConfig::default()).expect("Failed to create context");

    // Step 1: Self-test
    println!("Step 1: Running self-test...");
    crypto.initialize().expect("Self-test failed");
    println!("  Ready: {}", crypto.is_ready());
    println!();

    // Step 2: Key pairs
    println!("Step 2: Generating Kyber-1024 key pairs for Alice, Bob and Carol...");
    let alice = crypto.generate_keypair().expect("Failed to create Alice's keypair");
    let bob = crypto.generate_keypair().expect("Failed to create Bob's keypair");
    let carol = crypto.generate_keypair().expect("Failed to create Carol's keypair");

    println!("  Alice: {} ({} byte public key)", alice.fingerprint(), alice.public_key().len());
    println!("  Bob:   {}", bob.fingerprint());
    println!("  Carol: {}", carol.fingerprint());
    println!();

    // Step 3: Direct message
    println!("Step 3: Alice sends Bob a direct message...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                    HYBRID MESSAGE FLOW                      │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │   Alice                              Bob                    │");
    println!("  │     │                                  │                    │");
    println!("  │     │  encapsulate(Bob's public key)   │                    │");
    println!("  │     ▼                                  │                    │");
    println!("  │  ┌──────────────┐                      │                    │");
    println!("  │  │ shared secret│──► SHAKE-256 ──► cipher key + tag key     │");
    println!("  │  └──────────────┘                      │                    │");
    println!("  │     │                                  │                    │");
    println!("  │     │── KEM ciphertext ‖ nonce ‖ body ‖ tag ──►│            │");
    println!("  │     │                                  ▼                    │");
    println!("  │     │                    decapsulate(Bob's secret key)      │");
    println!("  │     │                    verify tag, then decrypt           │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let text = "Meet at the usual place at 8.";
    let message = crypto
        .encrypt_message(text, bob.public_key())
        .expect("Encryption failed");
    println!("  Plaintext:       {:?}", text);
    println!("  KEM ciphertext:  {} bytes", message.kem_ciphertext.len());
    println!("  Cipher body:     {} bytes", message.cipher_body.len());
    println!("  Auth tag:        {}...", hex::encode(&message.auth_tag[..8]));

    let decrypted = crypto
        .decrypt_message(&message, bob.secret_key())
        .expect("Decryption failed");
    println!("  Bob reads:       {:?}", decrypted);

    match crypto.decrypt_message(&message, carol.secret_key()) {
        Ok(_) => println!("  Carol reads it too (this should never happen)"),
        Err(e) => println!("  Carol gets:      {}", e),
    }
    println!();

    // Step 4: Group chat
    println!("Step 4: Creating a chat for all three...");
    let members = [alice.public_key(), bob.public_key(), carol.public_key()];
    let chat = crypto
        .generate_chat_secret(&members)
        .expect("Failed to create chat secret");
    println!("  Chat id:      {}", chat.chat_id);
    println!("  Participants: {:?}", chat.participants);

    let sent = crypto
        .encrypt_chat_message("Hello everyone!", &chat, carol.public_key())
        .expect("Chat encryption failed");
    let again = crypto
        .generate_chat_secret(&members)
        .expect("Failed to reload chat secret");
    let read = crypto
        .decrypt_chat_message(&sent, &again)
        .expect("Chat decryption failed");
    println!("  {} says: {:?}", sent.sender_id, read);
    println!();

    // Step 5: Memo envelope
    println!("Step 5: Attaching an encrypted memo to a payment...");
    let wire = crypto
        .encrypt_memo("Invoice #42, thanks!", alice.public_key())
        .expect("Memo encryption failed");
    let json = wire.to_json().expect("Failed to serialize memo");
    println!("  Envelope: {}...", &json[..json.len().min(96)]);

    let parsed = WireMessage::from_json(&json).expect("Failed to parse memo");
    let memo = crypto
        .decrypt_memo(&parsed, alice.secret_key())
        .expect("Memo decryption failed");
    println!("  Alice reads: {:?}", memo);
    println!();

    // Step 6: Timings
    println!("Step 6: Latency so far");
    let mut stats: Vec<_> = crypto.performance_stats().into_iter().collect();
    stats.sort_by_key(|(op, _)| *op);
    for (op, s) in stats {
        println!(
            "  {:<16} avg {:>7.3} ms  (min {:.3}, max {:.3}, n={})",
            op.as_str(),
            s.avg_ms,
            s.min_ms,
            s.max_ms,
            s.count
        );
    }

    crypto.shutdown();
    println!("\n=== Demo Complete ===");
}
