use config_store::{Key, StorageError};
use http::StatusCode;
use thiserror::Error;

/// Result type alias for repo-api operations
pub type Result<T, E = RepoApiError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum RepoApiError {
    /// Request payload or path parameters could not be decoded
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Request is well formed but breaks a business rule
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Store(#[from] StorageError),

    /// A stored document no longer satisfies the document invariants
    #[error("stored document {key} is corrupt: {reason}")]
    CorruptDocument { key: Key, reason: String },

    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepoApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RepoApiError::MalformedInput(_) | RepoApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            RepoApiError::Store(_)
            | RepoApiError::CorruptDocument { .. }
            | RepoApiError::Serialization(_)
            | RepoApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors caused by the caller, as opposed to failures of the service.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
