//! Statistical checks on the entropy source.

use std::collections::HashSet;

use quantum_core::crypto::{EntropySource, Quality};

#[test]
fn ten_thousand_nonces_are_unique() {
    let entropy = EntropySource::new().unwrap();
    let mut seen = HashSet::with_capacity(10_000);
    for _ in 0..10_000 {
        assert!(seen.insert(entropy.generate_nonce_array().unwrap()));
    }
}

#[test]
fn ten_thousand_bytes_are_never_poor() {
    let entropy = EntropySource::new().unwrap();
    for _ in 0..5 {
        let sample = entropy.generate_bytes(10_000).unwrap();
        let report = EntropySource::test_quality(&sample);
        assert_ne!(report.label, Quality::Poor, "chi-square {}", report.chi_square);
        assert_eq!(report.sample_len, 10_000);
    }
}

#[test]
fn symmetric_keys_differ() {
    let entropy = EntropySource::new().unwrap();
    let a = entropy.generate_symmetric_key().unwrap();
    let b = entropy.generate_symmetric_key().unwrap();
    assert_ne!(*a, *b);
}
