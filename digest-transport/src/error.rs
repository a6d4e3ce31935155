//! Digest transport error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// The request body is a stream and cannot be sent twice
    #[error("Request body cannot be replayed for the authenticated retry")]
    BodyNotReplayable,

    /// Server answered 401 without telling us how to authenticate
    #[error("401 response without WWW-Authenticate header")]
    MissingChallenge,

    /// WWW-Authenticate header present but unusable
    #[error("Failed to parse WWW-Authenticate: {0}")]
    InvalidChallenge(String),

    /// Underlying HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
