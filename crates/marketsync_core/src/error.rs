//! Error types for marketsync core.

use crate::types::ConnectionId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core queue and registry operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Journal store error.
    #[error("store error: {0}")]
    Store(#[from] marketsync_store::StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A journal record failed its checksum or could not be decoded.
    #[error("journal corruption: {message}")]
    JournalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// The requested connection is not configured.
    #[error("connection not found: {id}")]
    ConnectionNotFound {
        /// The connection id that was looked up.
        id: ConnectionId,
    },

    /// The connection configuration file is invalid.
    #[error("connection config error: {message}")]
    ConnectionConfig {
        /// Description of the problem.
        message: String,
    },

    /// Another process holds the state directory lock.
    #[error("state directory locked: another process has exclusive access")]
    StateLocked,

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a journal corruption error.
    pub fn journal_corruption(message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            message: message.into(),
        }
    }

    /// Creates a connection config error.
    pub fn connection_config(message: impl Into<String>) -> Self {
        Self::ConnectionConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
