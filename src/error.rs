//! Custom error types for bibmerge.
//!
//! Provider failures never surface here as errors to callers of the fetchers;
//! they are logged and turned into empty result sets. What remains are the
//! configuration, validation and storage failures the operator has to act on.

use thiserror::Error;

/// Main error type for bibmerge operations.
#[derive(Debug, Error)]
pub enum BibmergeError {
    /// Missing query or credential; raised before any network call
    #[error("Config error: {0}")]
    Config(String),

    /// Rejected input such as an unsafe table file name
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Provider name and response body
        message: String,
    },

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Requested table does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error on a table
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BibmergeError {
    /// Errors caused by operator input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Validation(_))
    }
}

/// Result type alias using `BibmergeError`
pub type Result<T> = std::result::Result<T, BibmergeError>;
