//! Cryptographic utilities for webhook signing secrets and payload signatures.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `X-Signature` header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Prefix of generated webhook signing secrets.
pub const SECRET_PREFIX: &str = "whsec_";

/// Number of random bytes in a generated secret (hex encoded after the prefix).
const SECRET_BYTES: usize = 32;

/// Error type for signing operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}

/// Computes the HMAC-SHA256 of `payload` keyed by `secret` and returns it hex encoded.
///
/// `payload` must be the exact byte sequence that goes on the wire.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Formats a hex signature as an `X-Signature` header value.
pub fn signature_header(signature_hex: &str) -> String {
    format!("{}{}", SIGNATURE_PREFIX, signature_hex)
}

/// Verifies a signature produced by [`sign_payload`].
///
/// Accepts the bare hex digest or the `sha256=`-prefixed header form. The
/// comparison is constant-time. Any malformed input yields `false`.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let hex_part = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or(signature);

    let expected = match hex::decode(hex_part) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Generates a new random webhook signing secret (`whsec_` + 64 hex chars).
pub fn generate_webhook_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{}{}", SECRET_PREFIX, hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"booking.created"}"#;

    #[test]
    fn test_sign_payload_length() {
        let signature = sign_payload(SECRET, BODY).unwrap();
        assert_eq!(signature.len(), 64); // SHA256 produces 32 bytes = 64 hex chars
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sign_payload_known_vector() {
        // RFC 4231 test case 2
        let signature = sign_payload("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sign_payload_deterministic() {
        let a = sign_payload(SECRET, BODY).unwrap();
        let b = sign_payload(SECRET, BODY).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_payload_depends_on_secret() {
        let a = sign_payload(SECRET, BODY).unwrap();
        let b = sign_payload("whsec_other", BODY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_roundtrip() {
        let signature = sign_payload(SECRET, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, &signature));
    }

    #[test]
    fn test_verify_accepts_header_form() {
        let signature = sign_payload(SECRET, BODY).unwrap();
        let header = signature_header(&signature);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature(SECRET, BODY, &header));
    }

    #[test]
    fn test_verify_rejects_single_byte_change() {
        let signature = sign_payload(SECRET, BODY).unwrap();
        let mut tampered = BODY.to_vec();
        tampered[2] ^= 0x01;
        assert!(!verify_signature(SECRET, &tampered, &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signature = sign_payload(SECRET, BODY).unwrap();
        assert!(!verify_signature("whsec_wrong", BODY, &signature));
    }

    #[test]
    fn test_verify_malformed_input_returns_false() {
        assert!(!verify_signature(SECRET, BODY, ""));
        assert!(!verify_signature(SECRET, BODY, "sha256="));
        assert!(!verify_signature(SECRET, BODY, "not-hex-at-all"));
        assert!(!verify_signature(SECRET, BODY, "abc")); // odd length
        assert!(!verify_signature(SECRET, BODY, "deadbeef")); // truncated digest
    }

    #[test]
    fn test_generate_webhook_secret_format() {
        let secret = generate_webhook_secret();
        assert!(secret.starts_with(SECRET_PREFIX));
        let hex_part = &secret[SECRET_PREFIX.len()..];
        assert_eq!(hex_part.len(), SECRET_BYTES * 2);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_webhook_secret_unique() {
        let a = generate_webhook_secret();
        let b = generate_webhook_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn test_arbitrary_payloads_roundtrip() {
        use fake::{Fake, Faker};

        for _ in 0..20 {
            let secret: String = Faker.fake();
            let body: Vec<u8> = Faker.fake();
            let signature = sign_payload(&secret, &body).unwrap();
            assert!(verify_signature(&secret, &body, &signature));
        }
    }
}
