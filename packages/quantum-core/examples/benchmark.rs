//! # Benchmark
//!
//! Prints a JSON latency report for the KEM and hybrid paths.
//!
//! ## Run
//!
//! ```bash
//! cargo run --release --example benchmark -- 50
//! ```

use quantum_core::{CoreConfig, QuantumCrypto};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let iterations = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(20);

    let info = quantum_core::build_info();
    println!("=== Quantum Core {} ({}, {}) ===\n", info.version, info.kem, info.profile);

    let crypto = QuantumCrypto::new(CoreConfig::default()).expect("Failed to create context");
    let report = crypto.run_benchmark(iterations).expect("Benchmark failed");

    println!(
        "{}",
        serde_json::to_string_pretty(&report).expect("Failed to serialize report")
    );
}
