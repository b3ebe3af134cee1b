//! Error handling for the stencil template library.
//!
//! This module defines the main error type `Error` used throughout the
//! library, along with a convenient `Result` type alias. It uses `thiserror`
//! for easy error handling and implements conversions from common error
//! types.

use thiserror::Error;

/// Result type for stencil operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stencil operations
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A template source, directory or manifest does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A declared feature combination has no implementation
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An operation cannot proceed in the current filesystem state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A manifest file could not be parsed into a template
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new unsupported error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new invalid operation error
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a new invalid manifest error
    pub fn invalid_manifest<S: Into<String>>(msg: S) -> Self {
        Self::InvalidManifest(msg.into())
    }
}
