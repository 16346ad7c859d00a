//! Error types for traceview

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using traceview's Error
pub type Result<T> = std::result::Result<T, Error>;

/// traceview error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed trace event: {reason}")]
    MalformedEvent { reason: String },

    #[error("Source resource unavailable: {path}")]
    ResourceUnavailable { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Viewer error: {message}")]
    ViewerError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

impl Error {
    /// Build a MalformedEvent error with the given reason
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            reason: reason.into(),
        }
    }
}
