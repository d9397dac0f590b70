//! # ChaCha20 Stream Cipher
//!
//! A direct implementation of the RFC 8439 ChaCha20 keystream.
//!
//! ## Block Function
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CHACHA20 STATE (16 × u32)                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │     ┌──────────┬──────────┬──────────┬──────────┐                       │
//! │     │ const 0  │ const 1  │ const 2  │ const 3  │  "expand 32-byte k"   │
//! │     ├──────────┼──────────┼──────────┼──────────┤                       │
//! │     │  key 0   │  key 1   │  key 2   │  key 3   │                       │
//! │     ├──────────┼──────────┼──────────┼──────────┤  256-bit key          │
//! │     │  key 4   │  key 5   │  key 6   │  key 7   │                       │
//! │     ├──────────┼──────────┼──────────┼──────────┤                       │
//! │     │ counter  │ nonce 0  │ nonce 1  │ nonce 2  │  32-bit ctr, 96-bit n │
//! │     └──────────┴──────────┴──────────┴──────────┘                       │
//! │                                                                         │
//! │  10 double rounds:                                                     │
//! │    columns:   QR(0,4,8,12)  QR(1,5,9,13)  QR(2,6,10,14) QR(3,7,11,15)  │
//! │    diagonals: QR(0,5,10,15) QR(1,6,11,12) QR(2,7,8,13)  QR(3,4,9,14)   │
//! │                                                                         │
//! │  QR: a+=b; d^=a; d<<<=16;  c+=d; b^=c; b<<<=12;                         │
//! │      a+=b; d^=a; d<<<=8;   c+=d; b^=c; b<<<=7                           │
//! │                                                                         │
//! │  keystream block = serialize(working_state + initial_state)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Side Channels
//!
//! Only 32-bit add, xor and fixed-distance rotate are used. No branch and no
//! table index depends on key, nonce or data, so on targets whose add/xor/
//! rotate instructions run in constant time the keystream does too. Stronger
//! guarantees (power analysis, fault injection) need hardware support and are
//! not attempted here; no masking constants are applied, since a fixed mask
//! is public and protects nothing.
//!
//! ## Confidentiality Only
//!
//! ChaCha20 on its own is malleable. Callers that need integrity go through
//! [`crate::crypto::seal`], which adds a keyed SHAKE-256 tag.

use zeroize::{Zeroize, Zeroizing};

use super::entropy::EntropySource;
use crate::error::{Error, Result};

/// Size of the ChaCha20 key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the ChaCha20 nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of one keystream block in bytes
pub const BLOCK_SIZE: usize = 64;

/// First block counter used for message encryption (RFC 8439 §2.4)
pub const INITIAL_COUNTER: u32 = 1;

/// "expand 32-byte k"
const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

#[inline(always)]
fn quarter_round(state: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(7);
}

fn init_state(key: &[u8; KEY_SIZE], counter: u32, nonce: &[u8; NONCE_SIZE]) -> [u32; 16] {
    let mut state = [0u32; 16];
    state[..4].copy_from_slice(&CONSTANTS);
    for (i, word) in key.chunks_exact(4).enumerate() {
        state[4 + i] = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }
    state[12] = counter;
    for (i, word) in nonce.chunks_exact(4).enumerate() {
        state[13 + i] = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }
    state
}

/// Compute one 64-byte keystream block
///
/// Both the initial and the working state are zeroized before returning.
pub fn block(key: &[u8; KEY_SIZE], counter: u32, nonce: &[u8; NONCE_SIZE], out: &mut [u8; BLOCK_SIZE]) {
    let mut initial = init_state(key, counter, nonce);
    let mut working = initial;

    for _ in 0..10 {
        quarter_round(&mut working, 0, 4, 8, 12);
        quarter_round(&mut working, 1, 5, 9, 13);
        quarter_round(&mut working, 2, 6, 10, 14);
        quarter_round(&mut working, 3, 7, 11, 15);

        quarter_round(&mut working, 0, 5, 10, 15);
        quarter_round(&mut working, 1, 6, 11, 12);
        quarter_round(&mut working, 2, 7, 8, 13);
        quarter_round(&mut working, 3, 4, 9, 14);
    }

    for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
        let word = working[i].wrapping_add(initial[i]);
        chunk.copy_from_slice(&word.to_le_bytes());
    }

    initial.zeroize();
    working.zeroize();
}

fn validate_key(key: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    if key.len() != KEY_SIZE {
        return Err(Error::InvalidKeyLength {
            what: "stream cipher key",
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    let mut out = Zeroizing::new([0u8; KEY_SIZE]);
    out.copy_from_slice(key);
    Ok(out)
}

fn validate_nonce(nonce: &[u8]) -> Result<[u8; NONCE_SIZE]> {
    let nonce: [u8; NONCE_SIZE] = nonce.try_into().map_err(|_| Error::InvalidNonceLength {
        expected: NONCE_SIZE,
        actual: nonce.len(),
    })?;
    Ok(nonce)
}

/// XOR the keystream for `(key, nonce)` into `data`, starting at `counter`
///
/// Encryption and decryption are the same operation.
pub fn apply_keystream_from(key: &[u8], nonce: &[u8], counter: u32, data: &mut [u8]) -> Result<()> {
    let key = validate_key(key)?;
    let nonce = validate_nonce(nonce)?;

    let blocks = data.len().div_ceil(BLOCK_SIZE) as u64;
    let available = u64::from(u32::MAX - counter) + 1;
    if blocks > available {
        return Err(Error::MessageTooLarge(format!(
            "{} bytes exceeds the 32-bit block counter",
            data.len()
        )));
    }

    let mut keystream = [0u8; BLOCK_SIZE];
    for (i, chunk) in data.chunks_mut(BLOCK_SIZE).enumerate() {
        block(&key, counter.wrapping_add(i as u32), &nonce, &mut keystream);
        for (byte, k) in chunk.iter_mut().zip(keystream.iter()) {
            *byte ^= k;
        }
    }
    keystream.zeroize();

    Ok(())
}

/// XOR the message keystream (counter starting at [`INITIAL_COUNTER`]) into `data`
pub fn apply_keystream(key: &[u8], nonce: &[u8], data: &mut [u8]) -> Result<()> {
    apply_keystream_from(key, nonce, INITIAL_COUNTER, data)
}

/// Encrypt with a caller-supplied nonce; returns the bare ciphertext
pub fn encrypt_with_nonce(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut out = plaintext.to_vec();
    apply_keystream(key, nonce, &mut out)?;
    Ok(out)
}

/// Decrypt a bare ciphertext produced with a known nonce
pub fn decrypt_with_nonce(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(ciphertext.to_vec());
    apply_keystream(key, nonce, &mut out)?;
    Ok(out)
}

/// Encrypt with a fresh nonce from `entropy`
///
/// ## Returns
///
/// `nonce ‖ ciphertext`
pub fn encrypt(entropy: &EntropySource, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = entropy.generate_nonce_array()?;
    let mut out = Vec::with_capacity(NONCE_SIZE + plaintext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(plaintext);
    apply_keystream(key, &nonce, &mut out[NONCE_SIZE..])?;
    Ok(out)
}

/// Decrypt `nonce ‖ ciphertext`
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if data.len() < NONCE_SIZE {
        return Err(Error::InvalidMessage(format!(
            "cipher body of {} bytes is shorter than its nonce",
            data.len()
        )));
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    decrypt_with_nonce(key, nonce, ciphertext)
}

// ============================================================================
// TESTS
// ============================================================================
