//! Webhook signature verification using HMAC.
//!
//! GitHub signs webhook payloads with a shared secret and provides the
//! signature in two headers: `X-Hub-Signature-256` (`sha256=<hex>`, the
//! current scheme) and `X-Hub-Signature` (`sha1=<hex>`, legacy). When a
//! secret is configured, the SHA-256 header is preferred; the SHA-1 header
//! is only consulted when the SHA-256 one is absent. With no secret
//! configured, verification is skipped entirely.
//!
//! Verification happens before any payload parsing; invalid signatures are
//! rejected up front.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Parses a signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (wrong prefix, invalid hex).
/// Never panics.
pub fn parse_signature_header(header: &str, prefix: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix(prefix)?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload.
///
/// Useful for generating expected signatures in tests.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Computes the legacy HMAC-SHA1 signature of a payload.
pub fn compute_signature_sha1(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a `sha256=<hex>` header value.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Formats a signature as a legacy `sha1=<hex>` header value.
pub fn format_signature_header_sha1(signature: &[u8]) -> String {
    format!("sha1={}", hex::encode(signature))
}

/// Verifies a payload against the SHA-256 signature header.
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn verify_sha256(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected = match parse_signature_header(signature_header, "sha256=") {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    // Constant-time comparison via the HMAC library
    mac.verify_slice(&expected).is_ok()
}

/// Verifies a payload against the legacy SHA-1 signature header.
pub fn verify_sha1(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected = match parse_signature_header(signature_header, "sha1=") {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&expected).is_ok()
}

/// Verifies a webhook delivery.
///
/// - `secret` of `None` means verification is disabled: always passes.
/// - With a secret, the SHA-256 header is checked if present; otherwise the
///   SHA-1 header is checked; with neither header the delivery fails.
pub fn verify_delivery(
    payload: &[u8],
    secret: Option<&[u8]>,
    sha256_header: Option<&str>,
    sha1_header: Option<&str>,
) -> bool {
    let secret = match secret {
        None => return true,
        Some(secret) => secret,
    };

    match (sha256_header, sha1_header) {
        (Some(header), _) => verify_sha256(payload, header, secret),
        (None, Some(header)) => verify_sha1(payload, header, secret),
        (None, None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ========================================================================
    // Unit tests
    // ========================================================================

    #[test]
    fn parse_signature_header_valid() {
        let result = parse_signature_header("sha256=1234abcd", "sha256=");
        assert_eq!(result, Some(vec![0x12, 0x34, 0xab, 0xcd]));
    }

    #[test]
    fn parse_signature_header_wrong_prefix() {
        assert_eq!(parse_signature_header("sha1=1234abcd", "sha256="), None);
        assert_eq!(parse_signature_header("1234abcd", "sha256="), None);
    }

    #[test]
    fn parse_signature_header_invalid_hex() {
        assert_eq!(parse_signature_header("sha256=xyz", "sha256="), None);
        assert_eq!(parse_signature_header("sha256=abc", "sha256="), None); // odd length
    }

    /// Known setup from GitHub's webhook documentation.
    #[test]
    fn sha256_roundtrip() {
        let payload = b"Hello, World!";
        let secret = b"It's a Secret to Everybody";

        let sig = compute_signature(payload, secret);
        let header = format_signature_header(&sig);

        assert!(verify_sha256(payload, &header, secret));
        assert!(!verify_sha256(payload, &header, b"wrong-secret"));
    }

    #[test]
    fn sha1_roundtrip() {
        let payload = b"legacy payload";
        let secret = b"secret";

        let sig = compute_signature_sha1(payload, secret);
        let header = format_signature_header_sha1(&sig);

        assert!(verify_sha1(payload, &header, secret));
        assert!(!verify_sha1(payload, &header, b"other"));
    }

    #[test]
    fn disabled_secret_always_passes() {
        assert!(verify_delivery(b"anything", None, None, None));
        assert!(verify_delivery(b"anything", None, Some("sha256=garbage"), None));
    }

    #[test]
    fn configured_secret_with_no_headers_fails() {
        assert!(!verify_delivery(b"payload", Some(b"secret"), None, None));
    }

    #[test]
    fn sha256_header_is_preferred() {
        let payload = b"payload";
        let secret = b"secret";
        let good_sha1 = format_signature_header_sha1(&compute_signature_sha1(payload, secret));

        // A valid SHA-1 header cannot rescue a delivery whose SHA-256 header
        // is wrong: once the preferred header is present, only it counts.
        assert!(!verify_delivery(
            payload,
            Some(secret),
            Some("sha256=00ff"),
            Some(good_sha1.as_str()),
        ));
    }

    #[test]
    fn sha1_fallback_accepted_when_sha256_absent() {
        let payload = b"payload";
        let secret = b"secret";
        let good_sha1 = format_signature_header_sha1(&compute_signature_sha1(payload, secret));

        assert!(verify_delivery(
            payload,
            Some(secret),
            None,
            Some(good_sha1.as_str()),
        ));
    }

    #[test]
    fn modified_payload_fails() {
        let secret = b"secret";
        let sig = compute_signature(b"original payload", secret);
        let header = format_signature_header(&sig);

        assert!(verify_sha256(b"original payload", &header, secret));
        assert!(!verify_sha256(b"modified payload", &header, secret));
    }

    #[test]
    fn malformed_headers_fail_without_panicking() {
        let payload = b"test";
        let secret = b"secret";

        for header in ["", "sha256=", "sha256=zzzz", "sha1=abc123", "not-a-header"] {
            assert!(!verify_sha256(payload, header, secret));
        }
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    proptest! {
        /// Signing then verifying with the same secret always succeeds.
        #[test]
        fn prop_sign_verify_roundtrip(payload: Vec<u8>, secret: Vec<u8>) {
            let sig = compute_signature(&payload, &secret);
            let header = format_signature_header(&sig);
            prop_assert!(verify_sha256(&payload, &header, &secret));
            prop_assert!(verify_delivery(&payload, Some(&secret), Some(&header), None));
        }

        /// Verifying with a different secret always fails.
        #[test]
        fn prop_wrong_secret_fails(payload: Vec<u8>, secret1: Vec<u8>, secret2: Vec<u8>) {
            prop_assume!(secret1 != secret2);

            let sig = compute_signature(&payload, &secret1);
            let header = format_signature_header(&sig);
            prop_assert!(!verify_sha256(&payload, &header, &secret2));
        }

        /// The SHA-1 fallback roundtrips too.
        #[test]
        fn prop_sha1_roundtrip(payload: Vec<u8>, secret: Vec<u8>) {
            let sig = compute_signature_sha1(&payload, &secret);
            let header = format_signature_header_sha1(&sig);
            prop_assert!(verify_delivery(&payload, Some(&secret), None, Some(&header)));
        }

        /// Malformed headers never cause a panic.
        #[test]
        fn prop_malformed_header_no_panic(header: String, payload: Vec<u8>, secret: Vec<u8>) {
            let _ = verify_sha256(&payload, &header, &secret);
            let _ = verify_sha1(&payload, &header, &secret);
            let _ = verify_delivery(&payload, Some(&secret), Some(&header), Some(&header));
        }

        /// A disabled secret accepts anything.
        #[test]
        fn prop_disabled_secret_accepts_all(payload: Vec<u8>, header: String) {
            prop_assert!(verify_delivery(&payload, None, Some(&header), None));
        }
    }
}
