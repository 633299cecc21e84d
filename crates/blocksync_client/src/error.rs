//! Error types for the remote client.

use blocksync_model::ModelError;
use std::time::Duration;
use thiserror::Error;

/// Result type for remote operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur talking to the remote API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The API key was rejected.
    #[error("unauthorized: check the API key and the integration's access")]
    Unauthorized,

    /// The object does not exist, is archived, or is not shared.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server kept throttling after the automatic retry.
    #[error("rate limited (retry after {retry_after:?})")]
    Throttled {
        /// Delay requested by the server.
        retry_after: Duration,
    },

    /// Any other non-success response.
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// API error code.
        code: String,
        /// API error message.
        message: String,
    },

    /// A response body could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A response could not be mapped to the data model.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// A batched write failed partway through.
    #[error("batch {batch_index} failed after {blocks_written} blocks were written: {source}")]
    BatchFailed {
        /// Zero-based index of the failed batch.
        batch_index: usize,
        /// Blocks written by earlier batches.
        blocks_written: usize,
        /// Cause of the failure.
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a caller could retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { retryable, .. } => *retryable,
            ClientError::Throttled { .. } => true,
            ClientError::BatchFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for a missing or archived object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}
