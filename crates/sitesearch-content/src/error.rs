//! Content source error types.

use thiserror::Error;

/// Errors raised while reading the CMS.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The site map could not be retrieved; nothing can be indexed
    #[error("Site map unavailable: {0}")]
    SiteMap(String),

    /// Path is not in the site map
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// A single page could not be fetched
    #[error("Failed to fetch page {path}: {message}")]
    Page { path: String, message: String },

    /// Page fetch exceeded its deadline
    #[error("Timed out fetching page {0}")]
    Timeout(String),

    /// Non-success response from the CMS
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport failure talking to the CMS
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ContentError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ContentError::Http { status, .. } => *status == 429 || *status >= 500,
            ContentError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ContentError::Timeout(_) => true,
            _ => false,
        }
    }
}
