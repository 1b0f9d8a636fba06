//! # marketsync Core
//!
//! The durable heart of marketsync: change-tracking work queues, the
//! marketplace connection registry, per-connection import cursors, and the
//! change watchers that feed the queues.
//!
//! ## Architecture
//!
//! - [`ConnectionRegistry`] holds the configured marketplace connections.
//!   It is read-only here; an external configuration surface writes the
//!   `connections.json` it loads from.
//! - [`ChangeWatcher`] translates "entity changed" notifications from the
//!   host store into queue entries, one per in-scope active connection.
//! - [`WorkQueue`] is an at-least-once, journal-backed work queue keyed by
//!   `(connection, entity)`, with idempotent enqueue, atomic batch claims,
//!   a bounded retry ceiling, and stale-claim reclamation.
//! - [`CursorStore`] records, per connection, the last marketplace order
//!   position that was successfully imported.
//! - [`StateDir`] owns the on-disk layout and holds an exclusive lock so
//!   only one process drains the queues at a time.
//!
//! ## Key invariants
//!
//! - At most one live queue entry per `(connection, entity)`
//! - A claim is handed to exactly one caller while it is fresh
//! - In-flight entries older than the stale threshold are reclaimable,
//!   which is also the crash-recovery path
//! - `Done` and `Failed` are terminal until the retention sweep removes them
//! - Cursors only move forward, and only after a durable host-store create

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod cursor;
mod error;
mod journal;
mod queue;
mod state;
mod types;
mod watcher;

pub use config::{QueueConfig, RetryPolicy};
pub use connection::{Connection, ConnectionRegistry, Credentials, ExportRules};
pub use cursor::CursorStore;
pub use error::{CoreError, CoreResult};
pub use queue::{ClaimedEntry, EntryStatus, ExportBatch, FailedEntry, QueueCounts, WorkQueue};
pub use state::StateDir;
pub use types::{now_ms, ConnectionId, EntityId, EntityKind};
pub use watcher::ChangeWatcher;
