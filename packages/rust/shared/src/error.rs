//! Error types for whguide.
//!
//! Library crates use [`GuideError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all whguide operations.
#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    /// A required argument was missing or out of range. Raised before any
    /// network activity.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Network/HTTP error on a single request.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed or unexpected response body.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Workbook storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GuideError>;

impl GuideError {
    /// Create an invalid-argument error from any displayable message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = GuideError::invalid_argument("Need a list of typeIds");
        assert_eq!(err.to_string(), "invalid argument: Need a list of typeIds");

        let err = GuideError::parse("expected value at line 1 column 1");
        assert!(err.to_string().starts_with("parse error:"));
    }
}
