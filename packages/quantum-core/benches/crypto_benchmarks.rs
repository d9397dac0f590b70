//! Performance benchmarks for quantum-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quantum_core::crypto::{chacha20, kem, EntropySource};
use quantum_core::{SecureStore, StoreConfig};
use std::sync::Arc;

const SMALL_MESSAGE: usize = 64;
const MEDIUM_MESSAGE: usize = 4 * 1024;
const LARGE_MESSAGE: usize = 1024 * 1024;

fn generate_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Kyber-1024 primitives
fn bench_kem(c: &mut Criterion) {
    let mut group = c.benchmark_group("kem");
    let keypair = kem::generate_keypair().expect("keygen");
    let encapsulation = kem::encapsulate(keypair.public_key()).expect("encapsulate");

    group.bench_function("generate_keypair", |b| {
        b.iter(|| kem::generate_keypair().expect("keygen"))
    });
    group.bench_function("encapsulate", |b| {
        b.iter(|| kem::encapsulate(black_box(keypair.public_key())).expect("encapsulate"))
    });
    group.bench_function("decapsulate", |b| {
        b.iter(|| {
            kem::decapsulate(black_box(keypair.secret_key()), black_box(&encapsulation.ciphertext))
                .expect("decapsulate")
        })
    });

    group.finish();
}

/// Raw ChaCha20 keystream throughput
fn bench_stream_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("chacha20");
    let key = [7u8; chacha20::KEY_SIZE];
    let nonce = [9u8; chacha20::NONCE_SIZE];

    for size in [SMALL_MESSAGE, MEDIUM_MESSAGE, LARGE_MESSAGE] {
        let data = generate_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encrypt", size), &data, |b, data| {
            b.iter(|| chacha20::encrypt_with_nonce(&key, &nonce, black_box(data)).expect("encrypt"))
        });
    }

    group.finish();
}

/// Full hybrid path
fn bench_hybrid(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid");
    let entropy = EntropySource::new().expect("entropy");
    let keypair = kem::generate_keypair().expect("keygen");

    for size in [SMALL_MESSAGE, MEDIUM_MESSAGE, LARGE_MESSAGE] {
        let data = generate_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encrypt", size), &data, |b, data| {
            b.iter(|| kem::hybrid_encrypt(&entropy, black_box(data), keypair.public_key()).expect("encrypt"))
        });

        let message = kem::hybrid_encrypt(&entropy, &data, keypair.public_key()).expect("encrypt");
        group.bench_with_input(BenchmarkId::new("decrypt", size), &message, |b, message| {
            b.iter(|| kem::hybrid_decrypt(black_box(message), keypair.secret_key()).expect("decrypt"))
        });
    }

    group.finish();
}

/// Entropy source output
fn bench_entropy(c: &mut Criterion) {
    let mut group = c.benchmark_group("entropy");
    let entropy = EntropySource::new().expect("entropy");

    group.bench_function("nonce", |b| b.iter(|| entropy.generate_nonce_array().expect("nonce")));
    group.throughput(Throughput::Bytes(4096));
    group.bench_function("bytes_4k", |b| b.iter(|| entropy.generate_bytes(4096).expect("bytes")));

    group.finish();
}

/// Secure store with production scrypt cost
fn bench_secure_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("secure_store");
    group.sample_size(10);

    let entropy = Arc::new(EntropySource::new().expect("entropy"));
    let store = SecureStore::new(entropy, StoreConfig::default()).expect("store");
    store.store("bench", &[1u8; 32], 60).expect("store");

    group.bench_function("store", |b| {
        b.iter(|| store.store("bench.write", black_box(&[2u8; 32]), 60).expect("store"))
    });
    group.bench_function("retrieve", |b| {
        b.iter(|| store.retrieve(black_box("bench")).expect("retrieve"))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_kem,
    bench_stream_cipher,
    bench_hybrid,
    bench_entropy,
    bench_secure_store
);
criterion_main!(benches);
