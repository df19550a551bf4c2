//! Error types for the record store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from a persistent backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The store directory is held by another process.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// A persisted table could not be read back.
    #[error("table {table} is corrupted: {message}")]
    Corrupted {
        /// Table name.
        table: String,
        /// Description of the corruption.
        message: String,
    },

    /// The record cannot be stored as given.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// Why the record was rejected.
        message: String,
    },

    /// Unknown table name.
    #[error("unknown table: {name}")]
    UnknownTable {
        /// The name that was looked up.
        name: String,
    },
}

impl StoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Creates a corruption error for a table.
    pub fn corrupted(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::Locked;
        assert_eq!(
            err.to_string(),
            "store locked: another process has exclusive access"
        );

        let err = StoreError::corrupted("customers", "truncated snapshot");
        assert!(err.to_string().contains("customers"));
        assert!(err.to_string().contains("truncated snapshot"));
    }

    #[test]
    fn io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
