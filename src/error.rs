//! Error types for the Musixmatch API.

use thiserror::Error;

/// Main error type for all Musixmatch operations.
#[derive(Debug, Error)]
pub enum MusixmatchError {
    /// A required parameter was left unset. Raised before any network
    /// call is attempted; never retried.
    #[error("Parameter {0} is unset, expected a value")]
    Validation(String),

    /// HTTP request failed at the transport level (connection, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("{method} returned status {status}")]
    RemoteStatus {
        /// API method that was called.
        method: String,
        /// The HTTP status received.
        status: reqwest::StatusCode,
    },

    /// A response was missing an expected part of its envelope.
    #[error("Response shape error: {0}")]
    Shape(String),

    /// JSON parsing failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Musixmatch operations.
pub type Result<T> = std::result::Result<T, MusixmatchError>;
