//! Error types shared across the site search crates.

use thiserror::Error;

/// Errors raised by the model and configuration layer.
#[derive(Debug, Error)]
pub enum SiteSearchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SiteSearchError::InvalidInput("document id is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: document id is empty");

        let err = SiteSearchError::Config("bad port".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
