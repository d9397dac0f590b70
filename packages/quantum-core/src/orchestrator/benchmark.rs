//! Benchmark harness for the KEM and hybrid paths.
//!
//! Numbers are hardware-dependent; callers should only compare runs made on
//! the same machine.

use serde::{Deserialize, Serialize};

use crate::crypto::{kem, EntropySource};
use crate::error::{Error, Result};
use crate::time::Stopwatch;

/// Plaintext size used for the hybrid encryption measurements
pub const BENCHMARK_PAYLOAD_SIZE: usize = 1024;

/// Average latencies over a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    /// Iterations per measurement
    pub iterations: usize,
    /// Average key pair generation time
    pub key_gen_avg_ms: f64,
    /// Average encapsulation time
    pub encaps_avg_ms: f64,
    /// Average decapsulation time
    pub decaps_avg_ms: f64,
    /// Average hybrid encryption time for a 1 KiB payload
    pub hybrid_encrypt_avg_ms: f64,
    /// Average hybrid decryption time for a 1 KiB payload
    pub hybrid_decrypt_avg_ms: f64,
    /// Wall time for the whole run
    pub total_ms: f64,
}

/// Run `iterations` rounds of every measured operation (at least one)
pub fn run(entropy: &EntropySource, iterations: usize) -> Result<BenchmarkReport> {
    let iterations = iterations.max(1);
    let total = Stopwatch::start();

    let payload = entropy.generate_bytes(BENCHMARK_PAYLOAD_SIZE)?;
    let mut key_gen = 0.0;
    let mut encaps = 0.0;
    let mut decaps = 0.0;
    let mut hybrid_encrypt = 0.0;
    let mut hybrid_decrypt = 0.0;

    for _ in 0..iterations {
        let watch = Stopwatch::start();
        let keypair = kem::generate_keypair()?;
        key_gen += watch.elapsed_ms();

        let watch = Stopwatch::start();
        let encapsulation = kem::encapsulate(keypair.public_key())?;
        encaps += watch.elapsed_ms();

        let watch = Stopwatch::start();
        let shared = kem::decapsulate(keypair.secret_key(), &encapsulation.ciphertext)?;
        decaps += watch.elapsed_ms();

        if *shared != *encapsulation.shared_secret {
            return Err(Error::KemMisbehaving("benchmark round trip produced different secrets".into()));
        }

        let watch = Stopwatch::start();
        let message = kem::hybrid_encrypt(entropy, &payload, keypair.public_key())?;
        hybrid_encrypt += watch.elapsed_ms();

        let watch = Stopwatch::start();
        kem::hybrid_decrypt(&message, keypair.secret_key())?;
        hybrid_decrypt += watch.elapsed_ms();
    }

    let n = iterations as f64;
    let report = BenchmarkReport {
        iterations,
        key_gen_avg_ms: key_gen / n,
        encaps_avg_ms: encaps / n,
        decaps_avg_ms: decaps / n,
        hybrid_encrypt_avg_ms: hybrid_encrypt / n,
        hybrid_decrypt_avg_ms: hybrid_decrypt / n,
        total_ms: total.elapsed_ms(),
    };

    tracing::info!(
        iterations,
        key_gen_ms = report.key_gen_avg_ms,
        encaps_ms = report.encaps_avg_ms,
        decaps_ms = report.decaps_avg_ms,
        hybrid_encrypt_ms = report.hybrid_encrypt_avg_ms,
        "Benchmark complete"
    );

    Ok(report)
}
