//! # Entropy Source
//!
//! A hashed entropy pool that serves random bytes, nonces and symmetric keys.
//!
//! ## Pool Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ENTROPY POOL                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Seeding (once, at construction)                                       │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  SHA-256(                                                    │       │
//! │  │    "seed" domain ‖ 64 B OS random ‖ µs timestamp ‖ jitter   │       │
//! │  │  )                                                           │       │
//! │  │           ↓                                                  │       │
//! │  │  pool (32 bytes), counter = 0                                │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Every 32-byte output block (under one lock)                           │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  counter += 1                                                │       │
//! │  │  output = SHA-256("output"  ‖ pool ‖ counter)                │       │
//! │  │  pool   = SHA-256("ratchet" ‖ pool ‖ counter ‖ fresh OS)     │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output and the next pool state are separate hashes, so an observed output
//! never equals a pool state, and a captured pool state cannot be run
//! backwards to earlier outputs. Fresh OS bytes are folded into every
//! ratchet step.
//!
//! If the OS random source is unavailable, construction and generation fail
//! with [`Error::EntropyUnavailable`]. There is no weaker fallback.

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};
use crate::time::now_timestamp_micros;

/// Size of the entropy pool in bytes (256 bits)
pub const POOL_SIZE: usize = 32;

/// Default nonce size in bytes (matches the stream cipher)
pub const DEFAULT_NONCE_SIZE: usize = 12;

/// Default key size in bytes (256 bits)
pub const DEFAULT_KEY_SIZE: usize = 32;

/// How many times key generation retries when the quality check reports `Poor`
pub const MAX_KEY_ATTEMPTS: u32 = 3;

/// Degrees of freedom of the byte-frequency chi-square test
const CHI_SQUARE_DOF: f64 = 255.0;

/// Domain separation strings for pool hashing
mod domain {
    pub const SEED: &[u8] = b"quantum-core-entropy-seed-v1";
    pub const OUTPUT: &[u8] = b"quantum-core-entropy-output-v1";
    pub const RATCHET: &[u8] = b"quantum-core-entropy-ratchet-v1";
}

/// Coarse uniformity label returned by [`EntropySource::test_quality`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    /// Clearly non-uniform; key generation must retry
    Poor,
    /// Noticeably skewed
    Fair,
    /// Within normal statistical variation
    Good,
    /// Very close to the expected distribution
    Excellent,
}

impl Quality {
    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Poor => "poor",
            Quality::Fair => "fair",
            Quality::Good => "good",
            Quality::Excellent => "excellent",
        }
    }
}

/// Result of a byte-frequency uniformity check
#[derive(Debug, Clone, Copy)]
pub struct QualityReport {
    /// Pearson chi-square statistic over the 256 byte values
    pub chi_square: f64,
    /// 0-100, higher is closer to uniform
    pub score: f64,
    /// Coarse label derived from the score
    pub label: Quality,
    /// Number of bytes examined
    pub sample_len: usize,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct PoolState {
    pool: [u8; POOL_SIZE],
    counter: u64,
}

/// Thread-safe hashed entropy pool
///
/// The pool update and the counter increment happen under one lock, so two
/// concurrent callers never observe the same pool state.
pub struct EntropySource {
    state: Mutex<PoolState>,
}

impl EntropySource {
    /// Seed a new pool from the OS random source, a timestamp and timing jitter
    pub fn new() -> Result<Self> {
        let mut os_seed = Zeroizing::new([0u8; 64]);
        fill_from_os(&mut os_seed[..])?;
        let jitter = Zeroizing::new(collect_jitter());
        let timestamp = now_timestamp_micros().to_le_bytes();

        let pool = hash_parts(&[domain::SEED, &os_seed[..], &timestamp[..], &jitter[..]]);

        tracing::debug!("Entropy pool seeded");

        Ok(Self {
            state: Mutex::new(PoolState { pool, counter: 0 }),
        })
    }

    /// Fill `dest` with pool output
    pub fn fill(&self, dest: &mut [u8]) -> Result<()> {
        let mut fresh = Zeroizing::new([0u8; POOL_SIZE]);
        fill_from_os(&mut fresh[..])?;

        let mut guard = self.state.lock();
        let state = &mut *guard;

        for chunk in dest.chunks_mut(POOL_SIZE) {
            state.counter = state.counter.wrapping_add(1);
            let counter = state.counter.to_le_bytes();

            let block = Zeroizing::new(hash_parts(&[domain::OUTPUT, &state.pool[..], &counter[..]]));
            chunk.copy_from_slice(&block[..chunk.len()]);

            let next = hash_parts(&[domain::RATCHET, &state.pool[..], &counter[..], &fresh[..]]);
            state.pool.zeroize();
            state.pool = next;
        }

        Ok(())
    }

    /// Generate `n` random bytes
    pub fn generate_bytes(&self, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        self.fill(&mut out)?;
        Ok(out)
    }

    /// Generate a nonce of `len` bytes with the microsecond clock mixed into its tail
    ///
    /// The timestamp is XORed into the last (up to) 8 bytes, so two nonces
    /// taken at different microseconds differ even if the pool repeated.
    pub fn generate_nonce(&self, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Err(Error::InvalidNonceLength {
                expected: DEFAULT_NONCE_SIZE,
                actual: 0,
            });
        }

        let mut nonce = self.generate_bytes(len)?;
        let stamp = now_timestamp_micros().to_le_bytes();
        let tail = len.min(stamp.len());
        for (byte, t) in nonce[len - tail..].iter_mut().zip(stamp.iter()) {
            *byte ^= t;
        }

        Ok(nonce)
    }

    /// Generate a 12-byte stream cipher nonce
    pub fn generate_nonce_array(&self) -> Result<[u8; DEFAULT_NONCE_SIZE]> {
        let nonce = self.generate_nonce(DEFAULT_NONCE_SIZE)?;
        let mut out = [0u8; DEFAULT_NONCE_SIZE];
        out.copy_from_slice(&nonce);
        Ok(out)
    }

    /// Generate key material of `len` bytes, retrying on a `Poor` quality report
    pub fn generate_key(&self, len: usize) -> Result<Zeroizing<Vec<u8>>> {
        if len == 0 {
            return Err(Error::InvalidKeyLength {
                what: "generated key",
                expected: DEFAULT_KEY_SIZE,
                actual: 0,
            });
        }

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = Zeroizing::new(self.generate_bytes(len)?);
            let report = Self::test_quality(&key);
            if report.label != Quality::Poor {
                return Ok(key);
            }
            tracing::warn!(
                "Key material failed quality check (attempt {}/{}, chi-square {:.1})",
                attempt,
                MAX_KEY_ATTEMPTS,
                report.chi_square
            );
        }

        Err(Error::EntropyQuality {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    /// Generate a 32-byte symmetric key
    pub fn generate_symmetric_key(&self) -> Result<Zeroizing<[u8; DEFAULT_KEY_SIZE]>> {
        let key = self.generate_key(DEFAULT_KEY_SIZE)?;
        let mut out = Zeroizing::new([0u8; DEFAULT_KEY_SIZE]);
        out.copy_from_slice(&key);
        Ok(out)
    }

    /// Chi-square uniformity check over byte frequencies
    ///
    /// For uniform bytes the statistic averages 255 regardless of sample
    /// size; the score measures relative distance from that mean. Small
    /// samples only catch gross failures (e.g. all-equal bytes).
    pub fn test_quality(bytes: &[u8]) -> QualityReport {
        if bytes.is_empty() {
            return QualityReport {
                chi_square: 0.0,
                score: 0.0,
                label: Quality::Poor,
                sample_len: 0,
            };
        }

        let mut counts = [0u64; 256];
        for &b in bytes {
            counts[b as usize] += 1;
        }

        let expected = bytes.len() as f64 / 256.0;
        let chi_square: f64 = counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();

        let deviation = (chi_square - CHI_SQUARE_DOF).abs() / CHI_SQUARE_DOF;
        let score = (100.0 * (1.0 - deviation)).clamp(0.0, 100.0);
        let label = if deviation <= 0.2 {
            Quality::Excellent
        } else if deviation <= 0.4 {
            Quality::Good
        } else if deviation <= 0.75 {
            Quality::Fair
        } else {
            Quality::Poor
        };

        QualityReport {
            chi_square,
            score,
            label,
            sample_len: bytes.len(),
        }
    }
}

impl std::fmt::Debug for EntropySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropySource")
            .field("pool", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// PLATFORM SOURCES
// ============================================================================

fn fill_from_os(dest: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(dest)
        .map_err(|e| Error::EntropyUnavailable(e.to_string()))
}

fn hash_parts(parts: &[&[u8]]) -> [u8; POOL_SIZE] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Scheduling jitter between back-to-back monotonic clock reads.
#[cfg(not(target_arch = "wasm32"))]
fn collect_jitter() -> [u8; 32] {
    use std::time::Instant;

    const SAMPLES: u64 = 64;

    let start = Instant::now();
    let mut hasher = Sha256::new();
    let mut prev = start.elapsed().as_nanos();
    for i in 0..SAMPLES {
        let spins = 16 + (prev & 0x0f) as u64;
        let mut acc = i;
        for k in 0..spins {
            acc = acc.rotate_left(5) ^ k;
        }
        std::hint::black_box(acc);

        let now = start.elapsed().as_nanos();
        hasher.update((now - prev).to_le_bytes());
        prev = now;
    }
    hasher.finalize().into()
}

/// No monotonic clock on wasm32-unknown-unknown; the seed relies on OS randomness.
#[cfg(target_arch = "wasm32")]
fn collect_jitter() -> [u8; 32] {
    [0u8; 32]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_generate_bytes_length() {
        let source = EntropySource::new().unwrap();
        assert_eq!(source.generate_bytes(0).unwrap().len(), 0);
        assert_eq!(source.generate_bytes(1).unwrap().len(), 1);
        assert_eq!(source.generate_bytes(100).unwrap().len(), 100);
    }

    #[test]
    fn test_consecutive_outputs_differ() {
        let source = EntropySource::new().unwrap();
        let a = source.generate_bytes(32).unwrap();
        let b = source.generate_bytes(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_nonces_unique() {
        let source = EntropySource::new().unwrap();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let nonce = source.generate_nonce(DEFAULT_NONCE_SIZE).unwrap();
            assert_eq!(nonce.len(), DEFAULT_NONCE_SIZE);
            assert!(seen.insert(nonce), "duplicate nonce");
        }
    }

    #[test]
    fn test_zero_length_nonce_rejected() {
        let source = EntropySource::new().unwrap();
        assert!(matches!(
            source.generate_nonce(0),
            Err(Error::InvalidNonceLength { .. })
        ));
    }

    #[test]
    fn test_quality_of_output_never_poor() {
        let source = EntropySource::new().unwrap();
        for _ in 0..5 {
            let bytes = source.generate_bytes(10_000).unwrap();
            let report = EntropySource::test_quality(&bytes);
            assert_ne!(report.label, Quality::Poor, "chi-square {}", report.chi_square);
            assert!(report.score > 0.0);
        }
    }

    #[test]
    fn test_quality_detects_constant_bytes() {
        let report = EntropySource::test_quality(&[0u8; 10_000]);
        assert_eq!(report.label, Quality::Poor);
        assert_eq!(report.score, 0.0);

        let report = EntropySource::test_quality(&[]);
        assert_eq!(report.label, Quality::Poor);
    }

    #[test]
    fn test_quality_flags_suspiciously_perfect_counts() {
        // Every byte value exactly 40 times: chi-square is 0, far below the mean.
        let bytes: Vec<u8> = (0..10_240).map(|i| (i % 256) as u8).collect();
        let report = EntropySource::test_quality(&bytes);
        assert_eq!(report.chi_square, 0.0);
        assert_eq!(report.label, Quality::Poor);
    }

    #[test]
    fn test_generate_key() {
        let source = EntropySource::new().unwrap();
        let key = source.generate_key(32).unwrap();
        assert_eq!(key.len(), 32);

        let sym = source.generate_symmetric_key().unwrap();
        assert_ne!(&sym[..], &key[..]);

        assert!(source.generate_key(0).is_err());
    }

    #[test]
    fn test_concurrent_callers_get_distinct_output() {
        let source = Arc::new(EntropySource::new().unwrap());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let source = Arc::clone(&source);
            handles.push(std::thread::spawn(move || {
                (0..200)
                    .map(|_| source.generate_bytes(16).unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for out in handle.join().unwrap() {
                assert!(seen.insert(out));
            }
        }
        assert_eq!(seen.len(), 8 * 200);
    }

    #[test]
    fn test_debug_redacts_pool() {
        let source = EntropySource::new().unwrap();
        let dbg = format!("{:?}", source);
        assert!(dbg.contains("redacted"));
    }
}
