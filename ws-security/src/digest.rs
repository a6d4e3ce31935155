//! WS-Security password digest computation
//!
//! Implements the OASIS WS-Security UsernameToken Profile 1.1 password digest:
//! `digest = base64(sha1(nonce + created + password))`

use base64::{engine::general_purpose::STANDARD, Engine};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::error::WsSecurityError;

/// Compute the WS-Security password digest
///
/// Formula: `base64(sha1(nonce_bytes || created_bytes || password_bytes))`
///
/// # Arguments
/// * `nonce_b64` - Base64-encoded nonce from the UsernameToken
/// * `created` - RFC 3339 timestamp string exactly as sent by the client
/// * `password` - Plaintext password to compute digest for
pub fn compute_digest(
    nonce_b64: &str,
    created: &str,
    password: &str,
) -> Result<String, WsSecurityError> {
    let nonce_bytes = STANDARD
        .decode(nonce_b64)
        .map_err(|_| WsSecurityError::InvalidNonce)?;

    let mut hasher = Sha1::new();
    hasher.update(&nonce_bytes);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());

    Ok(STANDARD.encode(hasher.finalize()))
}

/// Compare two secrets without leaking the position of the first mismatch.
///
/// Length differences are still observable, which is unavoidable for
/// variable-length inputs.
pub fn secure_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_digest_reference_vector() {
        // Worked example from the ONVIF application programmer's guide
        let digest = compute_digest(
            "LKqI6G/AikKCQrN0zqZFlg==",
            "2010-09-16T07:50:45Z",
            "userpassword",
        )
        .unwrap();
        assert_eq!(digest, "tuOSpGlFlIXsozq4HFNeeGeFLEI=");
    }

    #[test]
    fn test_created_is_hashed_verbatim() {
        let nonce = "LKqI6G/AikKCQrN0zqZFlg==";
        let a = compute_digest(nonce, "2010-09-16T07:50:45Z", "pw").unwrap();
        let b = compute_digest(nonce, "2010-09-16T07:50:45.000Z", "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_secure_eq() {
        assert!(secure_eq("tuOSpGlFlIXsozq4HFNeeGeFLEI=", "tuOSpGlFlIXsozq4HFNeeGeFLEI="));
        assert!(!secure_eq("tuOSpGlFlIXsozq4HFNeeGeFLEI=", "different_digest_value"));
        assert!(!secure_eq("abc", "abd"));
    }

    #[test]
    fn test_invalid_nonce() {
        let result = compute_digest("not_valid_base64!!!", "2024-01-01T00:00:00Z", "password");
        assert!(matches!(result, Err(WsSecurityError::InvalidNonce)));
    }
}
