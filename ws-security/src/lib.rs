//! WS-Security UsernameToken authentication
//!
//! Implements the OASIS WS-Security UsernameToken Profile 1.1 for ONVIF authentication.
//! Both password modes are accepted: plaintext and `PasswordDigest`. Digest tokens
//! are protected against replay by a shared [`NonceCache`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ws_security::{Credentials, NonceCache, Validator};
//!
//! let nonces = Arc::new(NonceCache::default());
//! let validator = Validator::new(
//!     Credentials { username: "onvif".into(), password: "secret".into() },
//!     nonces.clone(),
//! );
//!
//! match validator.authenticate(soap_xml) {
//!     Ok(()) => println!("Authenticated!"),
//!     Err(e) => println!("Auth failed: {}", e),
//! }
//! ```

mod digest;
mod error;
mod nonce;
mod parse;

pub use digest::{compute_digest, secure_eq};
pub use error::WsSecurityError;
pub use nonce::{NonceCache, DEFAULT_NONCE_TTL};
pub use parse::{UsernameToken, PASSWORD_DIGEST_TYPE, PASSWORD_TEXT_TYPE};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Default tolerance between the client's `Created` timestamp and our clock.
pub const DEFAULT_MAX_SKEW: Duration = Duration::from_secs(300);

/// Credentials for validating WS-Security tokens
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Extract UsernameToken from SOAP XML
///
/// Parses the SOAP envelope and extracts the Security/UsernameToken element.
pub fn extract_token(xml: &str) -> Result<UsernameToken, WsSecurityError> {
    parse::parse_username_token(xml)
}

enum PasswordMode {
    Text,
    Digest,
}

fn password_mode(token: &UsernameToken) -> Result<PasswordMode, WsSecurityError> {
    match token.password_type.as_deref() {
        None | Some("") | Some(PASSWORD_TEXT_TYPE) => Ok(PasswordMode::Text),
        Some(PASSWORD_DIGEST_TYPE) => Ok(PasswordMode::Digest),
        Some(other) => Err(WsSecurityError::UnsupportedPasswordType(other.to_string())),
    }
}

/// Validates UsernameTokens against the gateway credentials.
#[derive(Debug, Clone)]
pub struct Validator {
    credentials: Credentials,
    nonces: Arc<NonceCache>,
    max_skew: Duration,
}

impl Validator {
    pub fn new(credentials: Credentials, nonces: Arc<NonceCache>) -> Self {
        Self {
            credentials,
            nonces,
            max_skew: DEFAULT_MAX_SKEW,
        }
    }

    /// Override the accepted clock skew for `Created` timestamps.
    pub fn with_max_skew(mut self, max_skew: Duration) -> Self {
        self.max_skew = max_skew;
        self
    }

    /// The replay cache shared with this validator.
    pub fn nonces(&self) -> &Arc<NonceCache> {
        &self.nonces
    }

    /// Extract and validate the UsernameToken in one call.
    pub fn authenticate(&self, xml: &str) -> Result<(), WsSecurityError> {
        let token = extract_token(xml)?;
        self.validate(&token)
    }

    /// Validate a parsed UsernameToken
    ///
    /// Digest checks run in this order:
    /// 1. Nonce and Created are present
    /// 2. Nonce has not been seen before (recorded atomically)
    /// 3. Created lies within the skew window
    /// 4. Password digest matches
    pub fn validate(&self, token: &UsernameToken) -> Result<(), WsSecurityError> {
        let mode = password_mode(token)?;

        if !secure_eq(&token.username, &self.credentials.username) {
            return Err(WsSecurityError::InvalidCredentials);
        }

        match mode {
            PasswordMode::Text => {
                tracing::warn!(
                    username = %token.username,
                    "Client authenticated with plaintext WS-Security password"
                );
                if !secure_eq(&token.password, &self.credentials.password) {
                    return Err(WsSecurityError::InvalidCredentials);
                }
                Ok(())
            }
            PasswordMode::Digest => self.validate_digest(token),
        }
    }

    fn validate_digest(&self, token: &UsernameToken) -> Result<(), WsSecurityError> {
        let nonce = token
            .nonce
            .as_deref()
            .ok_or_else(|| WsSecurityError::MissingElement("Nonce".into()))?;
        let created = token
            .created
            .as_deref()
            .ok_or_else(|| WsSecurityError::MissingElement("Created".into()))?;

        if !self.nonces.record(nonce) {
            return Err(WsSecurityError::ReplayDetected);
        }

        self.check_timestamp(created)?;

        let expected = compute_digest(nonce, created, &self.credentials.password)?;
        if !secure_eq(&token.password, &expected) {
            return Err(WsSecurityError::InvalidCredentials);
        }

        Ok(())
    }

    fn check_timestamp(&self, created: &str) -> Result<(), WsSecurityError> {
        let created = DateTime::parse_from_rfc3339(created)
            .map_err(|_| WsSecurityError::InvalidTimestamp)?
            .with_timezone(&Utc);

        let max_secs = self.max_skew.as_secs();
        let age = Utc::now().signed_duration_since(created).num_seconds();

        if age > max_secs as i64 {
            return Err(WsSecurityError::Expired {
                age_secs: age as u64,
                max_secs,
            });
        }
        if -age > max_secs as i64 {
            return Err(WsSecurityError::FromFuture {
                ahead_secs: (-age) as u64,
                max_secs,
            });
        }

        Ok(())
    }
}
