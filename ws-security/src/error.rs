//! WS-Security error types

use thiserror::Error;

/// Errors that can occur during WS-Security processing
#[derive(Debug, Error)]
pub enum WsSecurityError {
    /// Security header not found in SOAP envelope
    #[error("Missing Security header")]
    MissingSecurityHeader,

    /// UsernameToken not found in Security header
    #[error("Missing UsernameToken")]
    MissingUsernameToken,

    /// Required element missing from UsernameToken
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// Password Type attribute is neither plaintext nor digest
    #[error("Unsupported password type: {0}")]
    UnsupportedPasswordType(String),

    /// Nonce value has invalid Base64 encoding
    #[error("Invalid nonce encoding")]
    InvalidNonce,

    /// Nonce was already accepted inside the replay window
    #[error("Nonce already used (replay detected)")]
    ReplayDetected,

    /// Created timestamp has invalid format
    #[error("Invalid timestamp format")]
    InvalidTimestamp,

    /// Request timestamp is too old
    #[error("Request expired (age: {age_secs}s, max: {max_secs}s)")]
    Expired { age_secs: u64, max_secs: u64 },

    /// Request timestamp lies too far in the future
    #[error("Request timestamp in the future (ahead: {ahead_secs}s, max: {max_secs}s)")]
    FromFuture { ahead_secs: u64, max_secs: u64 },

    /// Username or password does not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// XML parsing failed
    #[error("XML parse error: {0}")]
    XmlError(String),
}
