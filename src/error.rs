// src/error.rs

//! Unified error handling for the tracker application.

use thiserror::Error;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (transport, timeout, or non-success status)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error (fatal at load time)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Classification could not produce a definite answer
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// The update run was cancelled before the commit step
    #[error("Update run cancelled")]
    Cancelled,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Reasons the status classifier can fail for a single snapshot.
///
/// All of these leave the vendor with an Unknown status for the pass; none
/// of them abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// The tracked page is behind a login wall
    #[error("login required to view the tracked page")]
    LoginRequired,

    /// The narrowing selector could not be applied to the fetched content
    #[error("filtering failed: {0}")]
    FilteringFailed(String),

    /// Both the OPEN and the CLOSED pattern sets matched
    #[error("status matched both open and closed")]
    AmbiguousMatch,

    /// Neither pattern set matched
    #[error("no status pattern matched")]
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_error_converts_into_app_error() {
        let error: AppError = ParserError::NoMatch.into();
        assert!(matches!(error, AppError::Parser(ParserError::NoMatch)));
    }

    #[test]
    fn error_messages_name_the_failure() {
        assert_eq!(
            ParserError::AmbiguousMatch.to_string(),
            "status matched both open and closed"
        );
        assert_eq!(
            AppError::config("bad pattern").to_string(),
            "Configuration error: bad pattern"
        );
    }
}
