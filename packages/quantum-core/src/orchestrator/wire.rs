//! # Wire Format
//!
//! JSON envelope for hybrid messages. Binary fields are standard base64.
//!
//! ```json
//! {
//!   "encryptedMessage": "<base64 nonce ‖ ciphertext>",
//!   "kyberCiphertext":  "<base64, 1568 bytes>",
//!   "authTag":          "<base64, 32 bytes>",
//!   "algorithm":        "Kyber1024-ChaCha20",
//!   "timestamp":        1700000000000,
//!   "security":         "NIST Level 5",
//!   "performanceMs":    3.2
//! }
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::chacha20::NONCE_SIZE;
use crate::crypto::kem::{HybridMessage, CIPHERTEXT_SIZE, SECURITY_LEVEL};
use crate::crypto::seal::TAG_SIZE;
use crate::error::{Error, Result};

/// JSON-serializable form of a [`HybridMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// base64 `nonce ‖ ciphertext`
    pub encrypted_message: String,
    /// base64 KEM ciphertext
    pub kyber_ciphertext: String,
    /// base64 authentication tag
    pub auth_tag: String,
    /// Algorithm identifier
    pub algorithm: String,
    /// Creation time (Unix milliseconds)
    pub timestamp: i64,
    /// Security level label
    pub security: String,
    /// Time the sender spent encrypting
    pub performance_ms: f64,
}

impl WireMessage {
    /// Encode a hybrid message
    pub fn from_hybrid(message: &HybridMessage, performance_ms: f64) -> Self {
        Self {
            encrypted_message: BASE64.encode(&message.cipher_body),
            kyber_ciphertext: BASE64.encode(&message.kem_ciphertext),
            auth_tag: BASE64.encode(message.auth_tag),
            algorithm: message.algorithm_tag.clone(),
            timestamp: message.timestamp_ms,
            security: SECURITY_LEVEL.to_string(),
            performance_ms,
        }
    }

    /// Decode back into a hybrid message, validating every length
    pub fn to_hybrid(&self) -> Result<HybridMessage> {
        let kem_ciphertext = BASE64.decode(&self.kyber_ciphertext)?;
        if kem_ciphertext.len() != CIPHERTEXT_SIZE {
            return Err(Error::InvalidCiphertextLength {
                expected: CIPHERTEXT_SIZE,
                actual: kem_ciphertext.len(),
            });
        }

        let cipher_body = BASE64.decode(&self.encrypted_message)?;
        if cipher_body.len() < NONCE_SIZE {
            return Err(Error::InvalidMessage(format!(
                "encryptedMessage is {} bytes, shorter than its nonce",
                cipher_body.len()
            )));
        }

        let tag = BASE64.decode(&self.auth_tag)?;
        let auth_tag: [u8; TAG_SIZE] = tag.as_slice().try_into().map_err(|_| {
            Error::InvalidMessage(format!("authTag is {} bytes, expected {}", tag.len(), TAG_SIZE))
        })?;

        Ok(HybridMessage {
            kem_ciphertext,
            cipher_body,
            auth_tag,
            algorithm_tag: self.algorithm.clone(),
            timestamp_ms: self.timestamp,
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kem::ALGORITHM_TAG;

    fn sample() -> HybridMessage {
        HybridMessage {
            kem_ciphertext: vec![1u8; CIPHERTEXT_SIZE],
            cipher_body: vec![2u8; NONCE_SIZE + 5],
            auth_tag: [3u8; TAG_SIZE],
            algorithm_tag: ALGORITHM_TAG.to_string(),
            timestamp_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let wire = WireMessage::from_hybrid(&sample(), 1.5);
        let json = wire.to_json().unwrap();

        for field in [
            "encryptedMessage",
            "kyberCiphertext",
            "authTag",
            "algorithm",
            "timestamp",
            "security",
            "performanceMs",
        ] {
            assert!(json.contains(field), "missing {}", field);
        }
        assert!(json.contains(SECURITY_LEVEL));
    }

    #[test]
    fn test_json_decodes_to_same_message() {
        let message = sample();
        let json = WireMessage::from_hybrid(&message, 0.0).to_json().unwrap();
        let decoded = WireMessage::from_json(&json).unwrap().to_hybrid().unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_bad_base64_is_validation_error() {
        let mut wire = WireMessage::from_hybrid(&sample(), 0.0);
        wire.encrypted_message = "***not base64***".into();

        let err = wire.to_hybrid().unwrap_err();
        assert!(err.is_caller_fixable());
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let mut short_ct = sample();
        short_ct.kem_ciphertext.truncate(100);
        let err = WireMessage::from_hybrid(&short_ct, 0.0).to_hybrid().unwrap_err();
        assert!(matches!(err, Error::InvalidCiphertextLength { actual: 100, .. }));

        let mut wire = WireMessage::from_hybrid(&sample(), 0.0);
        wire.auth_tag = BASE64.encode([0u8; 16]);
        assert!(matches!(wire.to_hybrid(), Err(Error::InvalidMessage(_))));

        let mut short_body = sample();
        short_body.cipher_body.truncate(4);
        let err = WireMessage::from_hybrid(&short_body, 0.0).to_hybrid().unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = WireMessage::from_json("{\"encryptedMessage\": 5}").unwrap_err();
        assert!(matches!(err, Error::DeserializationError(_)));
    }
}
