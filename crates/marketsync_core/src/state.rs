//! State directory management.
//!
//! marketsync keeps its durable state in one directory:
//!
//! ```text
//! <state_dir>/
//! ├─ LOCK                    # Advisory lock for single-process access
//! ├─ connections.json        # Connection definitions (written externally)
//! ├─ offer_queue.journal     # Offer update queue
//! ├─ shipment_queue.journal  # Shipment export queue
//! └─ cursors.journal         # Per-connection import cursors
//! ```
//!
//! The LOCK file ensures only one process drains the queues at a time.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const CONNECTIONS_FILE: &str = "connections.json";
const OFFER_QUEUE_FILE: &str = "offer_queue.journal";
const SHIPMENT_QUEUE_FILE: &str = "shipment_queue.journal";
const CURSORS_FILE: &str = "cursors.journal";

/// Owns the on-disk layout and the exclusive process lock.
///
/// Only one `StateDir` can exist per directory at a time; dropping it
/// releases the lock.
#[derive(Debug)]
pub struct StateDir {
    path: PathBuf,
    _lock_file: File,
}

impl StateDir {
    /// Opens or creates a state directory and takes the exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory does not exist and `create_if_missing` is false
    /// - another process holds the lock (returns [`CoreError::StateLocked`])
    /// - an I/O error occurs
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_operation(format!(
                    "state directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_operation(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path.join(LOCK_FILE))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| CoreError::StateLocked)?;

        tracing::debug!(path = %path.display(), "state directory locked");

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the state directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the connection definitions file.
    #[must_use]
    pub fn connections_path(&self) -> PathBuf {
        self.path.join(CONNECTIONS_FILE)
    }

    /// Returns the path of the offer queue journal.
    #[must_use]
    pub fn offer_queue_path(&self) -> PathBuf {
        self.path.join(OFFER_QUEUE_FILE)
    }

    /// Returns the path of the shipment queue journal.
    #[must_use]
    pub fn shipment_queue_path(&self) -> PathBuf {
        self.path.join(SHIPMENT_QUEUE_FILE)
    }

    /// Returns the path of the cursor journal.
    #[must_use]
    pub fn cursors_path(&self) -> PathBuf {
        self.path.join(CURSORS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_directory_and_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");

        let state = StateDir::open(&path, true).unwrap();
        assert!(path.join("LOCK").exists());
        assert_eq!(state.offer_queue_path(), path.join("offer_queue.journal"));
    }

    #[test]
    fn missing_directory_without_create_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing");

        let result = StateDir::open(&path, false);
        assert!(result.is_err());
    }

    #[test]
    fn second_open_is_locked_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");

        let _held = StateDir::open(&path, true).unwrap();
        let result = StateDir::open(&path, true);
        assert!(matches!(result, Err(CoreError::StateLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");

        {
            let _state = StateDir::open(&path, true).unwrap();
        }

        assert!(StateDir::open(&path, true).is_ok());
    }
}
