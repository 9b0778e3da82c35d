//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the blob storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object not found in storage.
    #[error("object not found: {0}")]
    NotFound(String),

    /// I/O error during storage operation.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Error from the underlying storage backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// Remote blob service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Invalid backend configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotFound("search-index/a.json".to_string());
        assert!(err.to_string().contains("search-index/a.json"));

        let err = StorageError::Http {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 403: forbidden");
    }
}
