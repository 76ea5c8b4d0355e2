//! Error types for ReturnScope.
//!
//! Library crates use [`ReturnScopeError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ReturnScope operations.
#[derive(Debug, thiserror::Error)]
pub enum ReturnScopeError {
    /// No usable credential context (missing/expired auth headers).
    #[error("auth error: {0}")]
    Auth(String),

    /// Transport-level HTTP failure.
    #[error("network error: {0}")]
    Network(String),

    /// Unparseable or unexpected response payload shape.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Malformed user input (invalid keys, empty valid-input set, bad range).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Match attempted against an empty index — crawl first.
    #[error("no data: {0}")]
    NoData(String),

    /// Enrichment exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// External enrichment context could not be opened.
    #[error("blocked: {0}")]
    Blocked(String),

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
pub type Result<T> = std::result::Result<T, ReturnScopeError>;

impl ReturnScopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a protocol error from any displayable message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
