//! Error handling for cocoon_analytics
//!
//! This module provides the error type and result alias returned by the
//! sharded driver and its collaborators.

use std::io;
use thiserror::Error;

use crate::shard::ShardError;

/// Errors that can occur in driver operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested dataset does not exist
    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),

    /// Failure inside the store: I/O on existence checks, listing or
    /// locking, malformed shard labels, mismatched cache entries, or an
    /// opaque executor failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// The executor rejected a write
    #[error("Insert failed: {0}")]
    InsertFailed(String),

    /// Group-by property is not a known dimension
    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    /// Group-by requested without a property
    #[error("Missing group-by property")]
    MissingProperty,

    /// Series interval is not a positive number of seconds
    #[error("Invalid interval: {0}")]
    InvalidInterval(i64),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors raised by the embedded SQLite engine
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid database name error
    pub fn invalid_database_name(name: impl Into<String>) -> Self {
        Self::InvalidDatabaseName(name.into())
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new insert failure
    pub fn insert_failed(message: impl Into<String>) -> Self {
        Self::InsertFailed(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Collapse any error into [`Error::Internal`], keeping its message
    pub fn into_internal(self) -> Self {
        match self {
            Self::Internal(_) => self,
            other => Self::Internal(other.to_string()),
        }
    }

    /// Check if the dataset was missing
    pub fn is_invalid_database_name(&self) -> bool {
        matches!(self, Self::InvalidDatabaseName(_))
    }

    /// Check if this is an internal error
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Check if a write was rejected
    pub fn is_insert_failed(&self) -> bool {
        matches!(self, Self::InsertFailed(_))
    }

    /// Check if the request itself was malformed
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidProperty(_) | Self::MissingProperty | Self::InvalidInterval(_)
        )
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Get a user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::InvalidDatabaseName(_) => {
                Some("Insert at least one record to create the dataset".to_string())
            }
            Self::InvalidProperty(_) => Some(
                "Use one of: event, path, ip, platform, refererDomain, countryCode".to_string(),
            ),
            Self::InvalidInterval(_) => {
                Some("Series interval must be a positive number of seconds".to_string())
            }
            Self::Io(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                Some("You don't have permission to access the data directory".to_string())
            }
            _ => None,
        }
    }
}

impl From<ShardError> for Error {
    fn from(err: ShardError) -> Self {
        Self::Internal(err.to_string())
    }
}
