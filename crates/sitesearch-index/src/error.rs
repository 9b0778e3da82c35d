//! Index error types.

use thiserror::Error;

/// Errors that can occur while building, exporting or importing an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Segment payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Segment key is not one this index produces
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),

    /// Segment was written by an incompatible index format
    #[error("Incompatible snapshot: expected format {expected}, found {found}")]
    IncompatibleSnapshot { expected: u32, found: u32 },

    /// Imported state violates an index invariant
    #[error("Integrity error: {0}")]
    Integrity(String),
}
