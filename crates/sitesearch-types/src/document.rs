//! The indexed page record.

use serde::{Deserialize, Serialize};

use crate::error::SiteSearchError;

/// One content page as it is indexed and returned from queries.
///
/// `content` is plain text: HTML already stripped and newlines collapsed.
/// A document is never mutated after construction; a rebuild produces a new
/// set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, the page's canonical path. Never empty.
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: String,
}

impl Document {
    /// Create a document, rejecting an empty id.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, SiteSearchError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SiteSearchError::InvalidInput(
                "document id must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id,
            title: title.into(),
            content: content.into(),
            url: url.into(),
        })
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SiteSearchError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SiteSearchError> {
        let doc: Document = serde_json::from_slice(bytes)?;
        if doc.id.trim().is_empty() {
            return Err(SiteSearchError::InvalidInput(
                "document id must not be empty".to_string(),
            ));
        }
        Ok(doc)
    }
}
