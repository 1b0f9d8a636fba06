//! Framed journal records over a [`JournalStore`].
//!
//! Every record is wrapped in an envelope:
//!
//! ```text
//! magic (4) | version (2) | type (1) | payload length (4) | payload | crc32 (4)
//! ```
//!
//! The CRC covers everything before it. Replay stops at the first frame
//! that is incomplete or fails its checksum and truncates the journal back
//! to the last good frame, so a torn write from a crash never poisons the
//! queue on reopen.

use crate::error::{CoreError, CoreResult};
use marketsync_store::JournalStore;

/// Magic bytes identifying a marketsync journal frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"MSJL";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Envelope size before the payload.
/// magic (4) + version (2) + type (1) + length (4) = 11 bytes
const HEADER_SIZE: usize = 11;

/// CRC size.
const CRC_SIZE: usize = 4;

/// Computes a CRC32 checksum (IEEE polynomial).
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

/// A framed, append-only journal over an opaque byte store.
///
/// The queue and cursor stores define their own record payloads; this type
/// owns only the envelope, checksumming, and torn-tail recovery.
pub struct FramedJournal {
    store: Box<dyn JournalStore>,
    flush_on_write: bool,
}

impl FramedJournal {
    /// Wraps a store.
    pub fn new(store: Box<dyn JournalStore>, flush_on_write: bool) -> Self {
        Self {
            store,
            flush_on_write,
        }
    }

    /// Appends one framed record.
    ///
    /// Returns the offset the frame was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds the 4-byte length field or
    /// the store fails.
    pub fn append(&mut self, record_type: u8, payload: &[u8]) -> CoreResult<u64> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            CoreError::invalid_operation("journal record payload too large")
        })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&JOURNAL_MAGIC);
        frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        frame.push(record_type);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(payload);

        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        let offset = self.store.append(&frame)?;

        if self.flush_on_write {
            self.store.flush()?;
        }

        Ok(offset)
    }

    /// Replays every intact frame in order, invoking `apply` with the
    /// record type and payload.
    ///
    /// If the journal ends in a torn or corrupt frame, the journal is
    /// truncated back to the end of the last intact frame and replay
    /// returns normally.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails, or if corruption is found
    /// *before* the final frame (which indicates real damage rather than
    /// a torn tail write).
    pub fn replay<F>(&mut self, mut apply: F) -> CoreResult<()>
    where
        F: FnMut(u8, &[u8]) -> CoreResult<()>,
    {
        let size = self.store.size()?;
        let mut offset = 0u64;

        while offset < size {
            match self.read_frame(offset, size)? {
                FrameRead::Frame {
                    record_type,
                    payload,
                    next_offset,
                } => {
                    apply(record_type, &payload)?;
                    offset = next_offset;
                }
                FrameRead::TornTail => {
                    tracing::warn!(
                        offset,
                        size,
                        "truncating torn journal tail from interrupted write"
                    );
                    self.store.truncate(offset)?;
                    self.store.flush()?;
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Replaces the journal contents with the given records.
    ///
    /// Used by compaction to rewrite only live entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn rewrite(&mut self, records: &[(u8, Vec<u8>)]) -> CoreResult<()> {
        self.store.truncate(0)?;
        for (record_type, payload) in records {
            self.append(*record_type, payload)?;
        }
        self.store.flush()?;
        Ok(())
    }

    /// Returns the journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.store.size()?)
    }

    fn read_frame(&self, offset: u64, size: u64) -> CoreResult<FrameRead> {
        let remaining = size - offset;

        if remaining < (HEADER_SIZE + CRC_SIZE) as u64 {
            return Ok(FrameRead::TornTail);
        }

        let header = self.store.read_at(offset, HEADER_SIZE)?;

        if header[0..4] != JOURNAL_MAGIC {
            // A bad magic anywhere but a clean tail means real corruption.
            return Err(CoreError::journal_corruption(format!(
                "bad magic at offset {offset}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(format!(
                "unsupported journal version {version}"
            )));
        }

        let record_type = header[6];
        let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as u64;

        let frame_len = HEADER_SIZE as u64 + len + CRC_SIZE as u64;
        if remaining < frame_len {
            return Ok(FrameRead::TornTail);
        }

        let payload = self
            .store
            .read_at(offset + HEADER_SIZE as u64, len as usize)?;
        let crc_bytes = self
            .store
            .read_at(offset + HEADER_SIZE as u64 + len, CRC_SIZE)?;
        let stored_crc =
            u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut check = Vec::with_capacity(HEADER_SIZE + payload.len());
        check.extend_from_slice(&header);
        check.extend_from_slice(&payload);

        if compute_crc32(&check) != stored_crc {
            // Checksum failure on the final frame is a torn write; anywhere
            // else it is damage we refuse to skip over.
            if offset + frame_len >= size {
                return Ok(FrameRead::TornTail);
            }
            return Err(CoreError::journal_corruption(format!(
                "checksum mismatch at offset {offset}"
            )));
        }

        Ok(FrameRead::Frame {
            record_type,
            payload,
            next_offset: offset + frame_len,
        })
    }
}

enum FrameRead {
    Frame {
        record_type: u8,
        payload: Vec<u8>,
        next_offset: u64,
    },
    TornTail,
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsync_store::MemoryJournal;

    fn collect(journal: &mut FramedJournal) -> Vec<(u8, Vec<u8>)> {
        let mut frames = Vec::new();
        journal
            .replay(|t, p| {
                frames.push((t, p.to_vec()));
                Ok(())
            })
            .unwrap();
        frames
    }

    #[test]
    fn crc32_known_value() {
        // CRC32 of "123456789" is a published test vector.
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_empty() {
        assert_eq!(compute_crc32(b""), 0);
    }

    #[test]
    fn append_then_replay() {
        let mut journal = FramedJournal::new(Box::new(MemoryJournal::new()), false);

        journal.append(1, b"first").unwrap();
        journal.append(2, b"second").unwrap();
        journal.append(1, b"").unwrap();

        let frames = collect(&mut journal);
        assert_eq!(
            frames,
            vec![
                (1, b"first".to_vec()),
                (2, b"second".to_vec()),
                (1, Vec::new()),
            ]
        );
    }

    fn encode_frame(record_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&JOURNAL_MAGIC);
        frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        frame.push(record_type);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    #[test]
    fn torn_tail_is_truncated() {
        let intact = encode_frame(1, b"intact");
        let torn = encode_frame(2, b"torn-away");

        // Chop the final frame in half, as a crash mid-write would.
        let mut raw = intact.clone();
        raw.extend_from_slice(&torn[..torn.len() / 2]);

        let mut journal =
            FramedJournal::new(Box::new(MemoryJournal::with_data(raw)), false);

        let frames = collect(&mut journal);
        assert_eq!(frames, vec![(1, b"intact".to_vec())]);
        assert_eq!(journal.size().unwrap(), intact.len() as u64);
    }

    #[test]
    fn corrupt_final_checksum_is_treated_as_torn() {
        let mut raw = encode_frame(1, b"good");
        let flipped = raw.len() - 1;
        raw[flipped] ^= 0xFF;

        let mut journal =
            FramedJournal::new(Box::new(MemoryJournal::with_data(raw)), false);

        let frames = collect(&mut journal);
        assert!(frames.is_empty());
        assert_eq!(journal.size().unwrap(), 0);
    }

    #[test]
    fn corruption_before_tail_is_an_error() {
        let mut raw = encode_frame(1, b"first");
        // Corrupt the first frame's payload, then append an intact frame.
        raw[HEADER_SIZE] ^= 0xFF;
        raw.extend_from_slice(&encode_frame(2, b"second"));

        let mut journal =
            FramedJournal::new(Box::new(MemoryJournal::with_data(raw)), false);

        let result = journal.replay(|_, _| Ok(()));
        assert!(matches!(
            result,
            Err(CoreError::JournalCorruption { .. })
        ));
    }

    #[test]
    fn rewrite_replaces_contents() {
        let mut journal = FramedJournal::new(Box::new(MemoryJournal::new()), false);
        journal.append(1, b"old-a").unwrap();
        journal.append(1, b"old-b").unwrap();

        journal.rewrite(&[(3, b"live".to_vec())]).unwrap();

        let frames = collect(&mut journal);
        assert_eq!(frames, vec![(3, b"live".to_vec())]);
    }

    #[test]
    fn empty_journal_replays_nothing() {
        let mut journal = FramedJournal::new(Box::new(MemoryJournal::new()), false);
        assert!(collect(&mut journal).is_empty());
    }
}
