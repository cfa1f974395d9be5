//! Error types shared across Clipstack crates.

use std::path::PathBuf;

/// Top-level error type for Clipstack operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipstackError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Launch error: {message}")]
    Launch { message: String },

    /// Encoder exited abnormally. `log` carries the full diagnostic
    /// stream captured from the child process.
    #[error("Encoding error: {message}")]
    Encode { message: String, log: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipstackError.
pub type ClipstackResult<T> = Result<T, ClipstackError>;

impl ClipstackError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>, log: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
            log: log.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
