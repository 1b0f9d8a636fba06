//! Durable, at-least-once work queues for offer and shipment export.
//!
//! A [`WorkQueue`] tracks pending synchronization work per
//! `(connection, entity)` pair. Every state transition is journaled before
//! it is acknowledged, so a queue reopened after a crash resumes exactly
//! where it stopped. The single internal mutex is the only synchronization
//! point between concurrent per-connection drains.
//!
//! # State machine
//!
//! ```text
//! enqueue           claim             mark_done
//!    │                │                   │
//!    ▼                ▼                   ▼
//! Pending ───────► InFlight ──────────► Done (terminal)
//!    ▲                │
//!    │                │ mark_failed(retryable), attempts < ceiling
//!    ├────────────────┤
//!    │                │ mark_failed at ceiling, or retryable = false
//!    │                ▼
//!    │             Failed (terminal)
//!    │
//!    └── stale-claim reclamation (InFlight older than the threshold)
//! ```

use crate::config::QueueConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::FramedJournal;
use crate::types::{now_ms, ConnectionId, EntityId, EntityKind};
use marketsync_store::{JournalStore, MemoryJournal};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Status of one queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Waiting to be claimed by a drain.
    Pending,
    /// Claimed by a drain and awaiting an API acknowledgment.
    InFlight,
    /// Exported successfully. Terminal until the retention sweep.
    Done,
    /// Exceeded the retry ceiling or failed fatally. Terminal and
    /// operator-visible until the retention sweep.
    Failed,
}

impl EntryStatus {
    /// Returns true for Done and Failed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn as_byte(self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::InFlight => 2,
            Self::Done => 3,
            Self::Failed => 4,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Pending),
            2 => Some(Self::InFlight),
            3 => Some(Self::Done),
            4 => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One entry claimed into an export batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedEntry {
    /// The entity to export.
    pub entity: EntityId,
    /// Failed attempts so far (0 on the first delivery).
    pub attempts: u32,
    /// When the entry was first enqueued, in Unix milliseconds.
    pub enqueued_at: u64,
}

/// A bounded group of entries claimed together for one API call.
///
/// Batches are ephemeral: they exist only for the duration of one drain
/// cycle and are never persisted. The claim they represent *is* persisted,
/// which is what makes stale-claim reclamation possible after a crash.
#[derive(Debug, Clone)]
pub struct ExportBatch {
    /// Batch identity, for log correlation.
    pub id: Uuid,
    /// The connection the batch belongs to.
    pub connection: ConnectionId,
    /// The entity kind of the owning queue.
    pub kind: EntityKind,
    /// The claimed entries, oldest first.
    pub entries: Vec<ClaimedEntry>,
    /// When the claim was made, in Unix milliseconds.
    pub claimed_at: u64,
}

impl ExportBatch {
    /// Returns the number of entries in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the batch holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entity ids in claim order.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entries.iter().map(|e| e.entity).collect()
    }
}

/// A terminally failed entry, surfaced for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    /// The connection the entry belongs to.
    pub connection: ConnectionId,
    /// The entity that could not be exported.
    pub entity: EntityId,
    /// Total failed attempts.
    pub attempts: u32,
    /// When the entry last transitioned, in Unix milliseconds.
    pub failed_at: u64,
}

/// Entry counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// Entries waiting to be claimed.
    pub pending: usize,
    /// Entries claimed and awaiting acknowledgment.
    pub in_flight: usize,
    /// Successfully exported entries awaiting cleanup.
    pub done: usize,
    /// Terminally failed entries awaiting cleanup.
    pub failed: usize,
}

/// Internal per-entry state.
#[derive(Debug, Clone)]
struct EntryState {
    status: EntryStatus,
    enqueued_at: u64,
    updated_at: u64,
    attempts: u32,
    claimed_at: Option<u64>,
}

type QueueKey = (ConnectionId, EntityId);

/// Journal record types.
mod record_type {
    pub const ENQUEUED: u8 = 1;
    pub const REFRESHED: u8 = 2;
    pub const CLAIMED: u8 = 3;
    pub const COMPLETED: u8 = 4;
    pub const FAILED: u8 = 5;
    pub const REMOVED: u8 = 6;
    pub const SNAPSHOT: u8 = 7;
}

struct QueueInner {
    journal: FramedJournal,
    entries: HashMap<QueueKey, EntryState>,
}

/// A durable work queue for one entity kind.
///
/// Shared across watcher and orchestrator threads behind an `Arc`; all
/// methods take `&self`.
pub struct WorkQueue {
    kind: EntityKind,
    config: QueueConfig,
    inner: Mutex<QueueInner>,
}

impl WorkQueue {
    /// Opens a queue over the given store, replaying any existing journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is corrupt or the store fails.
    pub fn open(
        store: Box<dyn JournalStore>,
        kind: EntityKind,
        config: QueueConfig,
    ) -> CoreResult<Self> {
        let mut journal = FramedJournal::new(store, config.flush_on_write);
        let mut entries: HashMap<QueueKey, EntryState> = HashMap::new();

        journal.replay(|record_type, payload| {
            apply_record(&mut entries, record_type, payload)
        })?;

        tracing::debug!(
            kind = %kind,
            entries = entries.len(),
            "work queue opened"
        );

        Ok(Self {
            kind,
            config,
            inner: Mutex::new(QueueInner { journal, entries }),
        })
    }

    /// Opens an ephemeral in-memory queue. Intended for tests.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible for parity with [`Self::open`].
    pub fn in_memory(kind: EntityKind, config: QueueConfig) -> CoreResult<Self> {
        Self::open(Box::new(MemoryJournal::new()), kind, config)
    }

    /// Returns the entity kind this queue tracks.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Records that an entity changed and needs to be exported for the
    /// given connection.
    ///
    /// Idempotent: if an entry for `(connection, entity)` is already live,
    /// a duplicate notification refreshes its timestamp, and inside the
    /// dedup window it is absorbed entirely. A notification for an entity
    /// whose previous entry is terminal starts a fresh entry with a reset
    /// attempt count.
    ///
    /// Returns true if the queue state changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails.
    pub fn enqueue(&self, connection: &ConnectionId, entity: EntityId) -> CoreResult<bool> {
        let mut inner = self.inner.lock();
        let now = now_ms();
        let key = (connection.clone(), entity);

        match inner.entries.get(&key) {
            Some(state) if !state.status.is_terminal() => {
                let age = now.saturating_sub(state.updated_at);
                if age <= self.config.dedup_window.as_millis() as u64 {
                    // Bursty edit; nothing to record.
                    return Ok(false);
                }

                let payload = encode_entry_event(connection, entity, now);
                inner.journal.append(record_type::REFRESHED, &payload)?;
                if let Some(state) = inner.entries.get_mut(&key) {
                    state.updated_at = now;
                }
                Ok(true)
            }
            _ => {
                let payload = encode_entry_event(connection, entity, now);
                inner.journal.append(record_type::ENQUEUED, &payload)?;
                inner.entries.insert(
                    key,
                    EntryState {
                        status: EntryStatus::Pending,
                        enqueued_at: now,
                        updated_at: now,
                        attempts: 0,
                        claimed_at: None,
                    },
                );
                tracing::debug!(kind = %self.kind, %connection, %entity, "enqueued");
                Ok(true)
            }
        }
    }

    /// Atomically claims up to `max` entries for one connection.
    ///
    /// Claimable entries are pending entries whose retry backoff has
    /// elapsed, plus in-flight entries whose claim is older than the stale
    /// threshold (recovering work lost to a crashed drain). Entries are
    /// claimed oldest first. Two concurrent callers can never receive
    /// overlapping entries: the transition to in-flight happens under the
    /// queue lock before the batch is returned.
    ///
    /// Returns `None` when nothing is claimable.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails.
    pub fn claim_batch(
        &self,
        connection: &ConnectionId,
        max: usize,
    ) -> CoreResult<Option<ExportBatch>> {
        if max == 0 {
            return Ok(None);
        }

        let mut inner = self.inner.lock();
        let now = now_ms();
        let stale_ms = self.config.stale_claim_after.as_millis() as u64;

        let mut candidates: Vec<(EntityId, u64, u32)> = inner
            .entries
            .iter()
            .filter(|((conn, _), _)| conn == connection)
            .filter_map(|((_, entity), state)| match state.status {
                EntryStatus::Pending => {
                    let backoff =
                        self.config.retry.delay_after_attempts(state.attempts);
                    let ready_at =
                        state.updated_at.saturating_add(backoff.as_millis() as u64);
                    (now >= ready_at).then_some((*entity, state.enqueued_at, state.attempts))
                }
                EntryStatus::InFlight => {
                    let claimed_at = state.claimed_at.unwrap_or(state.updated_at);
                    (now.saturating_sub(claimed_at) >= stale_ms)
                        .then_some((*entity, state.enqueued_at, state.attempts))
                }
                _ => None,
            })
            .collect();

        if candidates.is_empty() {
            return Ok(None);
        }

        candidates.sort_by_key(|(entity, enqueued_at, _)| (*enqueued_at, *entity));
        candidates.truncate(max);

        let mut claimed = Vec::with_capacity(candidates.len());
        for (entity, enqueued_at, attempts) in candidates {
            let payload = encode_entry_event(connection, entity, now);
            inner.journal.append(record_type::CLAIMED, &payload)?;

            let key = (connection.clone(), entity);
            if let Some(state) = inner.entries.get_mut(&key) {
                state.status = EntryStatus::InFlight;
                state.claimed_at = Some(now);
                state.updated_at = now;
            }

            claimed.push(ClaimedEntry {
                entity,
                attempts,
                enqueued_at,
            });
        }

        let batch = ExportBatch {
            id: Uuid::new_v4(),
            connection: connection.clone(),
            kind: self.kind,
            entries: claimed,
            claimed_at: now,
        };

        tracing::debug!(
            kind = %self.kind,
            connection = %batch.connection,
            batch = %batch.id,
            entries = batch.len(),
            "claimed batch"
        );

        Ok(Some(batch))
    }

    /// Marks every entry of a batch as successfully exported.
    ///
    /// # Errors
    ///
    /// Returns an error if a journal write fails.
    pub fn mark_done(&self, batch: &ExportBatch) -> CoreResult<()> {
        for entry in &batch.entries {
            self.mark_entry_done(&batch.connection, entry.entity)?;
        }
        Ok(())
    }

    /// Marks every entry of a batch as failed.
    ///
    /// With `retryable = true`, entries below the attempt ceiling return
    /// to pending with an incremented attempt count; entries at the
    /// ceiling, or any entry with `retryable = false`, become terminally
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns an error if a journal write fails.
    pub fn mark_failed(&self, batch: &ExportBatch, retryable: bool) -> CoreResult<()> {
        for entry in &batch.entries {
            self.mark_entry_failed(&batch.connection, entry.entity, retryable)?;
        }
        Ok(())
    }

    /// Marks a single entry as successfully exported.
    ///
    /// Marking an entry that is already done (or gone) is a silent no-op:
    /// a stale claimer acknowledging work that a reclaiming drain already
    /// finished is an expected race, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails.
    pub fn mark_entry_done(
        &self,
        connection: &ConnectionId,
        entity: EntityId,
    ) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        let now = now_ms();
        let key = (connection.clone(), entity);

        match inner.entries.get(&key) {
            Some(state) if state.status != EntryStatus::Done => {
                let payload = encode_entry_event(connection, entity, now);
                inner.journal.append(record_type::COMPLETED, &payload)?;
                if let Some(state) = inner.entries.get_mut(&key) {
                    state.status = EntryStatus::Done;
                    state.updated_at = now;
                    state.claimed_at = None;
                }
                Ok(())
            }
            _ => {
                tracing::debug!(%connection, %entity, "duplicate completion absorbed");
                Ok(())
            }
        }
    }

    /// Marks a single entry as failed, applying the retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal write fails.
    pub fn mark_entry_failed(
        &self,
        connection: &ConnectionId,
        entity: EntityId,
        retryable: bool,
    ) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        let now = now_ms();
        let key = (connection.clone(), entity);

        let Some(state) = inner.entries.get(&key) else {
            tracing::debug!(%connection, %entity, "failure for unknown entry absorbed");
            return Ok(());
        };
        if state.status.is_terminal() {
            tracing::debug!(%connection, %entity, "failure for terminal entry absorbed");
            return Ok(());
        }

        let attempts = state.attempts + 1;
        let terminal = !retryable || attempts >= self.config.retry.max_attempts;

        let payload = encode_failed(connection, entity, now, terminal);
        inner.journal.append(record_type::FAILED, &payload)?;

        if let Some(state) = inner.entries.get_mut(&key) {
            state.attempts = attempts;
            state.updated_at = now;
            state.claimed_at = None;
            state.status = if terminal {
                EntryStatus::Failed
            } else {
                EntryStatus::Pending
            };
        }

        if terminal {
            tracing::warn!(
                kind = %self.kind,
                %connection,
                %entity,
                attempts,
                "entry terminally failed"
            );
        } else {
            tracing::debug!(
                kind = %self.kind,
                %connection,
                %entity,
                attempts,
                "entry returned to pending"
            );
        }

        Ok(())
    }

    /// Removes terminal entries older than the retention age.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a journal write fails.
    pub fn sweep(&self) -> CoreResult<usize> {
        let mut inner = self.inner.lock();
        let now = now_ms();
        let retention_ms = self.config.retention.as_millis() as u64;

        let expired: Vec<QueueKey> = inner
            .entries
            .iter()
            .filter(|(_, state)| {
                state.status.is_terminal()
                    && now.saturating_sub(state.updated_at) >= retention_ms
            })
            .map(|(key, _)| key.clone())
            .collect();

        for (connection, entity) in &expired {
            let payload = encode_removed(connection, *entity);
            inner.journal.append(record_type::REMOVED, &payload)?;
            inner.entries.remove(&(connection.clone(), *entity));
        }

        if !expired.is_empty() {
            tracing::info!(kind = %self.kind, removed = expired.len(), "retention sweep");
        }

        Ok(expired.len())
    }

    /// Rewrites the journal so it holds exactly one snapshot record per
    /// live entry, reclaiming space from superseded transitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails.
    pub fn compact(&self) -> CoreResult<()> {
        let mut inner = self.inner.lock();

        let records: Vec<(u8, Vec<u8>)> = inner
            .entries
            .iter()
            .map(|((connection, entity), state)| {
                (record_type::SNAPSHOT, encode_snapshot(connection, *entity, state))
            })
            .collect();

        let before = inner.journal.size()?;
        inner.journal.rewrite(&records)?;
        let after = inner.journal.size()?;

        tracing::info!(kind = %self.kind, before, after, "journal compacted");
        Ok(())
    }

    /// Returns entry counts by status.
    #[must_use]
    pub fn counts(&self) -> QueueCounts {
        let inner = self.inner.lock();
        let mut counts = QueueCounts::default();
        for state in inner.entries.values() {
            match state.status {
                EntryStatus::Pending => counts.pending += 1,
                EntryStatus::InFlight => counts.in_flight += 1,
                EntryStatus::Done => counts.done += 1,
                EntryStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Returns the number of pending entries for one connection.
    #[must_use]
    pub fn pending_for(&self, connection: &ConnectionId) -> usize {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .filter(|((conn, _), state)| {
                conn == connection && state.status == EntryStatus::Pending
            })
            .count()
    }

    /// Returns the status of one entry, if it exists.
    #[must_use]
    pub fn status_of(&self, connection: &ConnectionId, entity: EntityId) -> Option<EntryStatus> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(&(connection.clone(), entity))
            .map(|state| state.status)
    }

    /// Returns the attempt count of one entry, if it exists.
    #[must_use]
    pub fn attempts_of(&self, connection: &ConnectionId, entity: EntityId) -> Option<u32> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(&(connection.clone(), entity))
            .map(|state| state.attempts)
    }

    /// Returns all terminally failed entries, for operator inspection.
    #[must_use]
    pub fn failed_entries(&self) -> Vec<FailedEntry> {
        let inner = self.inner.lock();
        let mut failed: Vec<FailedEntry> = inner
            .entries
            .iter()
            .filter(|(_, state)| state.status == EntryStatus::Failed)
            .map(|((connection, entity), state)| FailedEntry {
                connection: connection.clone(),
                entity: *entity,
                attempts: state.attempts,
                failed_at: state.updated_at,
            })
            .collect();
        failed.sort_by(|a, b| (&a.connection, a.entity).cmp(&(&b.connection, b.entity)));
        failed
    }
}

fn apply_record(
    entries: &mut HashMap<QueueKey, EntryState>,
    record_type: u8,
    payload: &[u8],
) -> CoreResult<()> {
    match record_type {
        record_type::ENQUEUED => {
            let (connection, entity, at) = decode_entry_event(payload)?;
            entries.insert(
                (connection, entity),
                EntryState {
                    status: EntryStatus::Pending,
                    enqueued_at: at,
                    updated_at: at,
                    attempts: 0,
                    claimed_at: None,
                },
            );
        }
        record_type::REFRESHED => {
            let (connection, entity, at) = decode_entry_event(payload)?;
            if let Some(state) = entries.get_mut(&(connection, entity)) {
                state.updated_at = at;
            }
        }
        record_type::CLAIMED => {
            let (connection, entity, at) = decode_entry_event(payload)?;
            if let Some(state) = entries.get_mut(&(connection, entity)) {
                state.status = EntryStatus::InFlight;
                state.claimed_at = Some(at);
                state.updated_at = at;
            }
        }
        record_type::COMPLETED => {
            let (connection, entity, at) = decode_entry_event(payload)?;
            if let Some(state) = entries.get_mut(&(connection, entity)) {
                state.status = EntryStatus::Done;
                state.updated_at = at;
                state.claimed_at = None;
            }
        }
        record_type::FAILED => {
            let (connection, entity, at, terminal) = decode_failed(payload)?;
            if let Some(state) = entries.get_mut(&(connection, entity)) {
                state.attempts += 1;
                state.updated_at = at;
                state.claimed_at = None;
                state.status = if terminal {
                    EntryStatus::Failed
                } else {
                    EntryStatus::Pending
                };
            }
        }
        record_type::REMOVED => {
            let (connection, entity) = decode_removed(payload)?;
            entries.remove(&(connection, entity));
        }
        record_type::SNAPSHOT => {
            let (key, state) = decode_snapshot(payload)?;
            entries.insert(key, state);
        }
        other => {
            return Err(CoreError::journal_corruption(format!(
                "unknown queue record type {other}"
            )));
        }
    }
    Ok(())
}

// --- record payload encoding ---

fn push_connection(buf: &mut Vec<u8>, connection: &ConnectionId) {
    let bytes = connection.as_str().as_bytes();
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn encode_entry_event(connection: &ConnectionId, entity: EntityId, at: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    push_connection(&mut buf, connection);
    buf.extend_from_slice(&entity.as_u64().to_le_bytes());
    buf.extend_from_slice(&at.to_le_bytes());
    buf
}

fn encode_failed(connection: &ConnectionId, entity: EntityId, at: u64, terminal: bool) -> Vec<u8> {
    let mut buf = encode_entry_event(connection, entity, at);
    buf.push(u8::from(terminal));
    buf
}

fn encode_removed(connection: &ConnectionId, entity: EntityId) -> Vec<u8> {
    let mut buf = Vec::new();
    push_connection(&mut buf, connection);
    buf.extend_from_slice(&entity.as_u64().to_le_bytes());
    buf
}

fn encode_snapshot(connection: &ConnectionId, entity: EntityId, state: &EntryState) -> Vec<u8> {
    let mut buf = Vec::new();
    push_connection(&mut buf, connection);
    buf.extend_from_slice(&entity.as_u64().to_le_bytes());
    buf.push(state.status.as_byte());
    buf.extend_from_slice(&state.enqueued_at.to_le_bytes());
    buf.extend_from_slice(&state.updated_at.to_le_bytes());
    buf.extend_from_slice(&state.attempts.to_le_bytes());
    buf.extend_from_slice(&state.claimed_at.unwrap_or(0).to_le_bytes());
    buf.push(u8::from(state.claimed_at.is_some()));
    buf
}

// --- record payload decoding ---

struct PayloadReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> CoreResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(CoreError::journal_corruption("short queue record payload")),
        }
    }

    fn take_u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> CoreResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn take_u32(&mut self) -> CoreResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take_u64(&mut self) -> CoreResult<u64> {
        let bytes = self.take(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(array))
    }

    fn take_connection(&mut self) -> CoreResult<ConnectionId> {
        let len = self.take_u16()? as usize;
        let bytes = self.take(len)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CoreError::journal_corruption("connection id is not UTF-8"))?;
        Ok(ConnectionId::new(text))
    }
}

fn decode_entry_event(payload: &[u8]) -> CoreResult<(ConnectionId, EntityId, u64)> {
    let mut reader = PayloadReader::new(payload);
    let connection = reader.take_connection()?;
    let entity = EntityId::new(reader.take_u64()?);
    let at = reader.take_u64()?;
    Ok((connection, entity, at))
}

fn decode_failed(payload: &[u8]) -> CoreResult<(ConnectionId, EntityId, u64, bool)> {
    let mut reader = PayloadReader::new(payload);
    let connection = reader.take_connection()?;
    let entity = EntityId::new(reader.take_u64()?);
    let at = reader.take_u64()?;
    let terminal = reader.take_u8()? != 0;
    Ok((connection, entity, at, terminal))
}

fn decode_removed(payload: &[u8]) -> CoreResult<(ConnectionId, EntityId)> {
    let mut reader = PayloadReader::new(payload);
    let connection = reader.take_connection()?;
    let entity = EntityId::new(reader.take_u64()?);
    Ok((connection, entity))
}

fn decode_snapshot(payload: &[u8]) -> CoreResult<(QueueKey, EntryState)> {
    let mut reader = PayloadReader::new(payload);
    let connection = reader.take_connection()?;
    let entity = EntityId::new(reader.take_u64()?);
    let status = EntryStatus::from_byte(reader.take_u8()?)
        .ok_or_else(|| CoreError::journal_corruption("unknown status in snapshot"))?;
    let enqueued_at = reader.take_u64()?;
    let updated_at = reader.take_u64()?;
    let attempts = reader.take_u32()?;
    let claimed_at_raw = reader.take_u64()?;
    let has_claim = reader.take_u8()? != 0;

    Ok((
        (connection, entity),
        EntryState {
            status,
            enqueued_at,
            updated_at,
            attempts,
            claimed_at: has_claim.then_some(claimed_at_raw),
        },
    ))
}
