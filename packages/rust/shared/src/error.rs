//! Error types for lakeport.
//!
//! Library crates use [`LakeportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all lakeport operations.
#[derive(Debug, thiserror::Error)]
pub enum LakeportError {
    /// The `.lakebook` path given to the converter does not exist.
    #[error("lakebook not found: {path}")]
    PackageNotFound { path: PathBuf },

    /// The package extracted but is not a valid lakebook (e.g. no `$meta.json`).
    #[error("malformed lakebook: {message}")]
    MalformedPackage { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching images.
    #[error("network error: {0}")]
    Network(String),

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LakeportError>;

impl LakeportError {
    /// Create a malformed-package error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPackage {
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
