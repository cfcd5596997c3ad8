//! Error types for the shard module
//!
//! Defines error types specific to shard discovery and labelling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during shard operations
#[derive(Error, Debug)]
pub enum ShardError {
    /// Error when a shard label is malformed
    #[error("Invalid shard label: {0}")]
    InvalidLabel(String),

    /// Timestamp cannot be mapped onto a shard
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Directory or file error
    #[error("File error for {path:?}: {message}")]
    File {
        path: PathBuf,
        message: String,
    },
}

/// Result type for shard operations
pub type ShardResult<T> = std::result::Result<T, ShardError>;

impl ShardError {
    /// Create a new invalid label error
    pub fn invalid_label(label: impl Into<String>) -> Self {
        Self::InvalidLabel(label.into())
    }

    /// Create a new timestamp error
    pub fn timestamp_error(message: impl Into<String>) -> Self {
        Self::Timestamp(message.into())
    }

    /// Create a new file error
    pub fn file_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this is a label parse error
    pub fn is_invalid_label(&self) -> bool {
        matches!(self, Self::InvalidLabel(_))
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::File { .. })
    }
}
