//! In-memory journal store for tests and ephemeral queues.

use crate::error::{StoreError, StoreResult};
use crate::store::JournalStore;
use parking_lot::RwLock;

/// An in-memory journal store.
///
/// Suitable for unit tests and for queues that do not need to survive a
/// restart. Thread-safe.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    data: RwLock<Vec<u8>>,
}

impl MemoryJournal {
    /// Creates a new empty in-memory journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory journal seeded with existing bytes.
    ///
    /// Useful for testing replay and recovery paths.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the journal contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl JournalStore for MemoryJournal {
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StoreError::ReadOutOfBounds { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StoreResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StoreResult<()> {
        // Nothing buffered
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StoreResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;

        if new_size > size {
            return Err(StoreError::TruncateBeyondEnd {
                requested: new_size,
                size,
            });
        }

        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let journal = MemoryJournal::new();
        assert_eq!(journal.size().unwrap(), 0);
        assert!(journal.data().is_empty());
    }

    #[test]
    fn append_returns_offsets() {
        let mut journal = MemoryJournal::new();
        assert_eq!(journal.append(b"alpha").unwrap(), 0);
        assert_eq!(journal.append(b"beta").unwrap(), 5);
        assert_eq!(journal.size().unwrap(), 9);
    }

    #[test]
    fn read_at_returns_written_bytes() {
        let mut journal = MemoryJournal::new();
        journal.append(b"offer shipment").unwrap();

        assert_eq!(journal.read_at(0, 5).unwrap(), b"offer");
        assert_eq!(journal.read_at(6, 8).unwrap(), b"shipment");
    }

    #[test]
    fn read_past_end_fails() {
        let mut journal = MemoryJournal::new();
        journal.append(b"short").unwrap();

        let result = journal.read_at(3, 10);
        assert!(matches!(result, Err(StoreError::ReadOutOfBounds { .. })));
    }

    #[test]
    fn with_data_preloads() {
        let journal = MemoryJournal::with_data(b"recovered".to_vec());
        assert_eq!(journal.size().unwrap(), 9);
        assert_eq!(journal.read_at(0, 9).unwrap(), b"recovered");
    }

    #[test]
    fn truncate_discards_tail() {
        let mut journal = MemoryJournal::new();
        journal.append(b"keep/drop").unwrap();

        journal.truncate(4).unwrap();
        assert_eq!(journal.size().unwrap(), 4);
        assert_eq!(journal.read_at(0, 4).unwrap(), b"keep");
    }

    #[test]
    fn truncate_beyond_end_fails() {
        let mut journal = MemoryJournal::new();
        journal.append(b"tiny").unwrap();

        let result = journal.truncate(100);
        assert!(matches!(result, Err(StoreError::TruncateBeyondEnd { .. })));
    }
}
