//! Error types for the batch engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while selecting containers or acting on them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad flag combination, detected before any runtime call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Identifier did not resolve to a container.
    #[error("no such container: {0}")]
    NotFound(String),

    /// The runtime rejected or failed an operation on a container.
    #[error("unable to {action} container {container}: {reason}")]
    RuntimeOperationFailed {
        action: &'static str,
        container: String,
        reason: String,
    },

    /// A parallel batch finished with at least one failed unit.
    #[error("{failed} of {total} containers failed")]
    PartialBatchFailure { failed: usize, total: usize },

    /// The container's creation artifact could not be decoded.
    #[error("invalid creation artifact: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn runtime(
        action: &'static str,
        container: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::RuntimeOperationFailed {
            action,
            container: container.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
