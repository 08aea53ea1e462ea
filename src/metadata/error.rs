//! Collaborator error types.

use thiserror::Error;

/// Result type for collaborator operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised by the schema source, metadata store or metadata sink.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The HTTP request could not be sent or its body not read.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The engine answered with a non-success status.
    #[error("engine error {status}: {message} (code: {code})")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Error code from the engine body.
        code: String,
        /// Error message from the engine body.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response decoded but did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl MetadataError {
    /// Create a remote error from a status and an engine error body.
    pub fn remote(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// The engine reported the object as already present.
    ///
    /// Tracking an already-tracked table or re-creating an existing
    /// relationship yields this; callers treating those calls as idempotent
    /// can ignore it.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Remote { code, .. } if code == "already-exists" || code == "already-tracked")
    }
}
