//! Relay client error types

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Relay answered with a JSON `{"error": ...}` body
    #[error("relay API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected status code: {status}, body: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("relay API not ready after {timeout:?}: {last_error}")]
    NotReady { timeout: Duration, last_error: String },

    #[error("failed to delete existing path {path}: {source}")]
    DeleteExisting {
        path: String,
        #[source]
        source: Box<RelayError>,
    },

    #[error("failed to recreate path {path}: {source}")]
    Recreate {
        path: String,
        #[source]
        source: Box<RelayError>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl RelayError {
    /// The relay's one recognised "already exists" signal.
    pub fn is_path_exists(&self) -> bool {
        matches!(
            self,
            RelayError::Api { status: 400, message } if message == "path already exists"
        )
    }
}
