//! Per-connection import cursors.
//!
//! A cursor records the position of the last marketplace order that was
//! successfully imported for one connection. Cursors are owned exclusively
//! by the order importer and only ever move forward, after the host-store
//! order has been durably created.

use crate::error::{CoreError, CoreResult};
use crate::journal::FramedJournal;
use crate::types::ConnectionId;
use marketsync_store::{JournalStore, MemoryJournal};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Record type for a cursor advance.
const CURSOR_SET: u8 = 1;

struct CursorInner {
    journal: FramedJournal,
    cursors: HashMap<ConnectionId, u64>,
}

/// Journal-backed store of per-connection import cursors.
pub struct CursorStore {
    inner: Mutex<CursorInner>,
}

impl CursorStore {
    /// Opens a cursor store, replaying any existing journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is corrupt or the store fails.
    pub fn open(store: Box<dyn JournalStore>, flush_on_write: bool) -> CoreResult<Self> {
        let mut journal = FramedJournal::new(store, flush_on_write);
        let mut cursors: HashMap<ConnectionId, u64> = HashMap::new();

        journal.replay(|record_type, payload| {
            if record_type != CURSOR_SET {
                return Err(CoreError::journal_corruption(format!(
                    "unknown cursor record type {record_type}"
                )));
            }
            let (connection, position) = decode_cursor(payload)?;
            cursors.insert(connection, position);
            Ok(())
        })?;

        Ok(Self {
            inner: Mutex::new(CursorInner { journal, cursors }),
        })
    }

    /// Opens an ephemeral in-memory cursor store. Intended for tests.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible for parity with [`Self::open`].
    pub fn in_memory() -> CoreResult<Self> {
        Self::open(Box::new(MemoryJournal::new()), false)
    }

    /// Returns the cursor for a connection; zero if no order was ever
    /// imported.
    #[must_use]
    pub fn get(&self, connection: &ConnectionId) -> u64 {
        let inner = self.inner.lock();
        inner.cursors.get(connection).copied().unwrap_or(0)
    }

    /// Advances the cursor for a connection.
    ///
    /// Positions only move forward; an advance to a position at or below
    /// the current one is absorbed as a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails.
    pub fn advance(&self, connection: &ConnectionId, position: u64) -> CoreResult<()> {
        let mut inner = self.inner.lock();

        let current = inner.cursors.get(connection).copied().unwrap_or(0);
        if position <= current {
            return Ok(());
        }

        let payload = encode_cursor(connection, position);
        inner.journal.append(CURSOR_SET, &payload)?;
        inner.cursors.insert(connection.clone(), position);

        tracing::debug!(%connection, position, "import cursor advanced");
        Ok(())
    }
}

fn encode_cursor(connection: &ConnectionId, position: u64) -> Vec<u8> {
    let bytes = connection.as_str().as_bytes();
    let mut buf = Vec::with_capacity(2 + bytes.len() + 8);
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&position.to_le_bytes());
    buf
}

fn decode_cursor(payload: &[u8]) -> CoreResult<(ConnectionId, u64)> {
    if payload.len() < 2 {
        return Err(CoreError::journal_corruption("short cursor record"));
    }
    let len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    if payload.len() != 2 + len + 8 {
        return Err(CoreError::journal_corruption("malformed cursor record"));
    }
    let text = std::str::from_utf8(&payload[2..2 + len])
        .map_err(|_| CoreError::journal_corruption("connection id is not UTF-8"))?;
    let mut position_bytes = [0u8; 8];
    position_bytes.copy_from_slice(&payload[2 + len..]);
    Ok((ConnectionId::new(text), u64::from_le_bytes(position_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let cursors = CursorStore::in_memory().unwrap();
        assert_eq!(cursors.get(&ConnectionId::new("amazon")), 0);
    }

    #[test]
    fn advance_moves_forward() {
        let cursors = CursorStore::in_memory().unwrap();
        let amazon = ConnectionId::new("amazon");

        cursors.advance(&amazon, 10).unwrap();
        assert_eq!(cursors.get(&amazon), 10);

        cursors.advance(&amazon, 25).unwrap();
        assert_eq!(cursors.get(&amazon), 25);
    }

    #[test]
    fn advance_never_moves_backward() {
        let cursors = CursorStore::in_memory().unwrap();
        let amazon = ConnectionId::new("amazon");

        cursors.advance(&amazon, 25).unwrap();
        cursors.advance(&amazon, 10).unwrap();
        assert_eq!(cursors.get(&amazon), 25);
    }

    #[test]
    fn cursors_are_per_connection() {
        let cursors = CursorStore::in_memory().unwrap();
        let amazon = ConnectionId::new("amazon");
        let ebay = ConnectionId::new("ebay");

        cursors.advance(&amazon, 5).unwrap();
        assert_eq!(cursors.get(&amazon), 5);
        assert_eq!(cursors.get(&ebay), 0);
    }

    #[test]
    fn cursors_survive_reopen() {
        use marketsync_store::FileJournal;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("cursors.journal");
        let amazon = ConnectionId::new("amazon");

        {
            let store = FileJournal::open(&path).unwrap();
            let cursors = CursorStore::open(Box::new(store), true).unwrap();
            cursors.advance(&amazon, 42).unwrap();
        }

        let store = FileJournal::open(&path).unwrap();
        let cursors = CursorStore::open(Box::new(store), true).unwrap();
        assert_eq!(cursors.get(&amazon), 42);
    }
}
