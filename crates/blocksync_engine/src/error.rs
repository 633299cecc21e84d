//! Error types for the sync engine.

use blocksync_client::ClientError;
use blocksync_model::ModelError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while pushing or pulling documents.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The remote API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A value could not be decoded or rendered.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Local file access failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The sync state file exists but cannot be read as state.
    #[error("sync state file {path} is corrupted: {reason}")]
    StateCorrupted {
        /// State file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A local document cannot be pushed as it stands.
    #[error("invalid document {path}: {reason}")]
    InvalidDocument {
        /// Document path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// The operation needs configuration that is missing.
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl EngineError {
    /// Creates an invalid document error.
    pub fn invalid_document(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the remote reported the document as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Client(e) if e.is_not_found())
    }

    /// Returns true if retrying the same operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Client(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        let throttled = EngineError::Client(ClientError::Throttled {
            retry_after: std::time::Duration::from_secs(1),
        });
        assert!(throttled.is_retryable());
        assert!(!EngineError::NotConfigured("database".into()).is_retryable());
    }

    #[test]
    fn not_found_passes_through() {
        let err = EngineError::from(ClientError::NotFound("pages/x".into()));
        assert!(err.is_not_found());
        assert!(!EngineError::invalid_document("a.md", "bad").is_not_found());
    }

    #[test]
    fn error_display() {
        let err = EngineError::invalid_document("notes.md", "front matter is not a mapping");
        assert_eq!(
            err.to_string(),
            "invalid document notes.md: front matter is not a mapping"
        );
    }
}
