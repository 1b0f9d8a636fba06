//! Change watchers feeding the work queues.
//!
//! The host store calls [`ChangeWatcher::notify`] whenever an offer or a
//! shipment changes. The watcher fans the notification out into one queue
//! entry per active connection that has the entity in scope. The queue's
//! idempotent enqueue keeps bursty edits from growing the queue: a second
//! notification before the first is drained refreshes the existing entry
//! instead of adding a row.

use crate::connection::ConnectionRegistry;
use crate::error::CoreResult;
use crate::queue::WorkQueue;
use crate::types::{EntityId, EntityKind};
use std::sync::Arc;

/// Translates host-store change notifications into queue entries.
///
/// Two instances exist, one per entity kind, both structurally identical.
pub struct ChangeWatcher {
    kind: EntityKind,
    registry: Arc<ConnectionRegistry>,
    queue: Arc<WorkQueue>,
}

impl ChangeWatcher {
    /// Creates a watcher for the given kind.
    ///
    /// The queue's kind must match; this is a wiring error, not a runtime
    /// condition, so it is asserted.
    #[must_use]
    pub fn new(
        kind: EntityKind,
        registry: Arc<ConnectionRegistry>,
        queue: Arc<WorkQueue>,
    ) -> Self {
        assert_eq!(queue.kind(), kind, "watcher and queue kind must match");
        Self {
            kind,
            registry,
            queue,
        }
    }

    /// Handles one "entity changed" notification from the host store.
    ///
    /// Returns the number of connections for which work was recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if a journal write fails.
    pub fn notify(&self, entity: EntityId) -> CoreResult<usize> {
        let mut enqueued = 0;

        for connection in self.registry.snapshot_active() {
            if !connection.rules.in_scope(self.kind, entity) {
                continue;
            }
            if self.queue.enqueue(&connection.id, entity)? {
                enqueued += 1;
            }
        }

        tracing::debug!(kind = %self.kind, %entity, enqueued, "change notification");
        Ok(enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::connection::{Connection, Credentials, ExportRules};
    use crate::types::ConnectionId;
    use std::time::Duration;

    fn connection(id: &str, active: bool, rules: ExportRules) -> Connection {
        Connection {
            id: ConnectionId::new(id),
            name: id.into(),
            active,
            credentials: Credentials {
                public_key: "pk".into(),
                secret_key: "sk".into(),
                endpoint: "https://api.example".into(),
            },
            rules,
        }
    }

    fn watcher_with(connections: Vec<Connection>) -> (ChangeWatcher, Arc<WorkQueue>) {
        let registry = Arc::new(ConnectionRegistry::from_connections(connections).unwrap());
        let queue = Arc::new(
            WorkQueue::in_memory(
                EntityKind::Offer,
                QueueConfig::default()
                    .with_dedup_window(Duration::from_secs(60))
                    .with_flush_on_write(false),
            )
            .unwrap(),
        );
        (
            ChangeWatcher::new(EntityKind::Offer, registry, Arc::clone(&queue)),
            queue,
        )
    }

    #[test]
    fn fans_out_to_active_connections() {
        let (watcher, queue) = watcher_with(vec![
            connection("amazon", true, ExportRules::default()),
            connection("ebay", true, ExportRules::default()),
            connection("bol", false, ExportRules::default()),
        ]);

        let enqueued = watcher.notify(EntityId::new(42)).unwrap();
        assert_eq!(enqueued, 2);
        assert_eq!(queue.pending_for(&ConnectionId::new("amazon")), 1);
        assert_eq!(queue.pending_for(&ConnectionId::new("ebay")), 1);
        assert_eq!(queue.pending_for(&ConnectionId::new("bol")), 0);
    }

    #[test]
    fn respects_export_rules() {
        let excluded = ExportRules {
            excluded_entities: vec![EntityId::new(42)],
            ..ExportRules::default()
        };
        let offers_off = ExportRules {
            export_offers: false,
            ..ExportRules::default()
        };

        let (watcher, queue) = watcher_with(vec![
            connection("amazon", true, excluded),
            connection("ebay", true, offers_off),
            connection("bol", true, ExportRules::default()),
        ]);

        let enqueued = watcher.notify(EntityId::new(42)).unwrap();
        assert_eq!(enqueued, 1);
        assert_eq!(queue.pending_for(&ConnectionId::new("bol")), 1);
    }

    #[test]
    fn repeated_notifications_do_not_grow_queue() {
        let (watcher, queue) = watcher_with(vec![
            connection("amazon", true, ExportRules::default()),
            connection("ebay", true, ExportRules::default()),
        ]);

        // An offer changes three times before any drain.
        watcher.notify(EntityId::new(7)).unwrap();
        watcher.notify(EntityId::new(7)).unwrap();
        watcher.notify(EntityId::new(7)).unwrap();

        assert_eq!(queue.pending_for(&ConnectionId::new("amazon")), 1);
        assert_eq!(queue.pending_for(&ConnectionId::new("ebay")), 1);
    }
}
