//! Error types for snapshot persistence and index lifecycle.

use std::time::Duration;

use sitesearch_content::ContentError;
use sitesearch_index::IndexError;
use sitesearch_storage::StorageError;
use thiserror::Error;

/// Errors loading or inspecting a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Manifest missing, unreadable or inconsistent with the listing
    #[error("Invalid manifest for generation {generation}: {message}")]
    Manifest { generation: String, message: String },
}

/// Errors surfaced by the lifecycle manager.
///
/// Cloneable so that one shared flight can hand the same error to every
/// waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Query was empty or whitespace
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Content could not be read from the source
    #[error("Content fetch failed: {0}")]
    Fetch(String),

    /// Index build or verification failed
    #[error("Index error: {0}")]
    Index(String),

    /// A flight exceeded the rebuild deadline
    #[error("Index build timed out after {0:?}")]
    Timeout(Duration),

    /// The flight task ended without producing a result
    #[error("Index build aborted: {0}")]
    Aborted(String),
}

impl From<ContentError> for LifecycleError {
    fn from(e: ContentError) -> Self {
        LifecycleError::Fetch(e.to_string())
    }
}

impl From<IndexError> for LifecycleError {
    fn from(e: IndexError) -> Self {
        LifecycleError::Index(e.to_string())
    }
}
