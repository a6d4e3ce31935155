//! Camera control error types

use digest_transport::DigestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    /// Command does not start with an allowed verb
    #[error("command not allowed (must start with move/video/property/alarm): {0:?}")]
    CommandNotAllowed(String),

    #[error("{field} out of range: {value} (must be {min}-{max})")]
    OutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("invalid {kind} mode: {mode}")]
    InvalidMode { kind: &'static str, mode: String },

    #[error("unexpected status code: {status}, body: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("snapshot larger than {limit} bytes")]
    SnapshotTooLarge { limit: usize },

    #[error("camera not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Digest(#[from] DigestError),
}
