//! Error types for journal store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing a journal store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the journal.
    #[error("read beyond end of journal: offset {offset}, len {len}, journal size {size}")]
    ReadOutOfBounds {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current journal size.
        size: u64,
    },

    /// Attempted to truncate the journal to a larger size.
    #[error("cannot truncate journal of {size} bytes to {requested} bytes")]
    TruncateBeyondEnd {
        /// The requested new size.
        requested: u64,
        /// The current journal size.
        size: u64,
    },
}
