//! Journal store trait definition.

use crate::error::StoreResult;

/// An append-only byte store backing a journal.
///
/// Stores are **opaque**: the journal layer owns all record framing and
/// checksumming, and a store only moves bytes. This keeps the durable
/// queue logic independent of where the bytes live (memory, file).
///
/// # Invariants
///
/// - `append` returns the offset the data was written at
/// - `read_at` returns exactly the bytes previously appended there
/// - after `flush` returns, all appended data survives process termination
/// - stores are `Send + Sync` so queues can be shared across worker threads
pub trait JournalStore: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::ReadOutOfBounds`] if the requested range
    /// extends past the end of the journal, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>>;

    /// Appends data to the end of the journal.
    ///
    /// Returns the offset the data was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StoreResult<u64>;

    /// Flushes appended data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StoreResult<()>;

    /// Returns the current journal size in bytes.
    ///
    /// This is the offset the next `append` will write at.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StoreResult<u64>;

    /// Truncates the journal to `new_size` bytes.
    ///
    /// Used by compaction: live records are rewritten from offset zero
    /// after the journal has been truncated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::TruncateBeyondEnd`] if `new_size`
    /// exceeds the current size, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StoreResult<()>;
}
