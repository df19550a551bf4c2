//! Error types for the sync engine.

use repairsync_core::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No remote store is configured.
    #[error("remote store is not configured")]
    NotConfigured,

    /// The remote answered with a non-success status.
    #[error("remote error {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Raw server message.
        message: String,
    },

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A sync cycle is already running.
    #[error("sync already in progress")]
    AlreadySyncing,
}

impl SyncError {
    /// Creates a remote error from a status and body.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status for remote errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for failures of a single remote request.
    ///
    /// These are counted per record and never abort a push or sweep batch.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Remote { .. } | SyncError::Transport(_) | SyncError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::remote(409, "duplicate key value violates unique constraint");
        assert_eq!(
            err.to_string(),
            "remote error 409: duplicate key value violates unique constraint"
        );
        assert_eq!(err.status(), Some(409));

        assert_eq!(
            SyncError::AlreadySyncing.to_string(),
            "sync already in progress"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(SyncError::remote(500, "boom").is_transport());
        assert!(SyncError::Transport("connection reset".into()).is_transport());
        assert!(!SyncError::NotConfigured.is_transport());
        assert!(!SyncError::Store(StoreError::Locked).is_transport());
    }
}
