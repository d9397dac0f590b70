//! Property tests for the stream cipher.

use proptest::prelude::*;
use quantum_core::crypto::{chacha20, EntropySource};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn encrypt_then_decrypt_is_identity(
        key in prop::array::uniform32(any::<u8>()),
        plaintext in prop::collection::vec(any::<u8>(), 0..2048),
    ) {
        let entropy = EntropySource::new().unwrap();
        let sealed = chacha20::encrypt(&entropy, &key, &plaintext).unwrap();

        prop_assert_eq!(sealed.len(), chacha20::NONCE_SIZE + plaintext.len());
        let opened = chacha20::decrypt(&key, &sealed).unwrap();
        prop_assert_eq!(opened.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn keystream_is_an_involution(
        key in prop::array::uniform32(any::<u8>()),
        nonce in prop::array::uniform12(any::<u8>()),
        data in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut buf = data.clone();
        chacha20::apply_keystream(&key, &nonce, &mut buf).unwrap();
        chacha20::apply_keystream(&key, &nonce, &mut buf).unwrap();
        prop_assert_eq!(buf, data);
    }

    #[test]
    fn different_keys_give_different_ciphertext(
        key in prop::array::uniform32(any::<u8>()),
        flip in 0usize..32,
        nonce in prop::array::uniform12(any::<u8>()),
    ) {
        let mut other = key;
        other[flip] ^= 0x80;
        let plaintext = [0u8; 64];

        let a = chacha20::encrypt_with_nonce(&key, &nonce, &plaintext).unwrap();
        let b = chacha20::encrypt_with_nonce(&other, &nonce, &plaintext).unwrap();
        prop_assert_ne!(a, b);
    }
}
