//! Export orchestration across marketplace connections.
//!
//! Every operation takes one snapshot of the active connections and
//! processes each connection independently, in parallel. A connection's
//! failure is caught at its own boundary, classified, recorded in its
//! report, and never aborts a sibling connection's run. The queues' atomic
//! claim is the only synchronization point between concurrent drains.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::host::{HostCatalog, OfferSnapshot};
use crate::report::{run_connections, ConnectionReport, RunSummary};
use marketsync_api::{BatchOutcome, CatalogItem, MarketplaceApi, OfferUpdate, ShipmentUpdate};
use marketsync_core::{
    Connection, ConnectionId, ConnectionRegistry, EntityId, EntityKind, ExportBatch, WorkQueue,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How the catalog export selects its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogExportMode {
    /// Export only the queued (changed) offers.
    Queued,
    /// Re-enqueue every in-scope offer first, then drain. Used for
    /// first-time connection activation and manual resynchronization.
    Full,
}

/// Entries removed by a cleanup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Terminal offer entries removed.
    pub offer_entries_removed: usize,
    /// Terminal shipment entries removed.
    pub shipment_entries_removed: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct BatchStats {
    exported: usize,
    rejected: usize,
}

/// Drains the work queues per connection and calls the marketplace API.
pub struct ExportOrchestrator {
    registry: Arc<ConnectionRegistry>,
    offer_queue: Arc<WorkQueue>,
    shipment_queue: Arc<WorkQueue>,
    api: Arc<dyn MarketplaceApi>,
    host: Arc<dyn HostCatalog>,
    config: EngineConfig,
}

impl ExportOrchestrator {
    /// Creates an orchestrator over the given queues, API client, and host.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        offer_queue: Arc<WorkQueue>,
        shipment_queue: Arc<WorkQueue>,
        api: Arc<dyn MarketplaceApi>,
        host: Arc<dyn HostCatalog>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            offer_queue,
            shipment_queue,
            api,
            host,
            config,
        }
    }

    /// Exports full catalog items for queued offers on every active
    /// connection. In [`CatalogExportMode::Full`], the entire in-scope
    /// catalog is re-enqueued first.
    pub fn run_catalog_export(&self, mode: CatalogExportMode) -> RunSummary {
        let connections = self.registry.snapshot_active();
        run_connections("catalog-export", &connections, |connection| {
            if mode == CatalogExportMode::Full {
                match self.reenqueue_catalog(connection) {
                    Ok(enqueued) => {
                        tracing::info!(
                            connection = %connection.id,
                            enqueued,
                            "full catalog re-enqueued"
                        );
                    }
                    Err(e) => {
                        let mut report = ConnectionReport::new(connection.id.clone());
                        report.error = Some(e.to_string());
                        return report;
                    }
                }
            }
            self.drain_queue(&self.offer_queue, connection, |conn, batch| {
                self.send_offer_batch(conn, batch, true)
            })
        })
    }

    /// Exports queued stock/price updates on every active connection.
    pub fn run_queued_offer_export(&self) -> RunSummary {
        let connections = self.registry.snapshot_active();
        run_connections("queued-offer-export", &connections, |connection| {
            self.drain_queue(&self.offer_queue, connection, |conn, batch| {
                self.send_offer_batch(conn, batch, false)
            })
        })
    }

    /// Exports queued shipments on every active connection.
    pub fn run_queued_shipment_export(&self) -> RunSummary {
        let connections = self.registry.snapshot_active();
        run_connections("queued-shipment-export", &connections, |connection| {
            self.drain_queue(&self.shipment_queue, connection, |conn, batch| {
                self.send_shipment_batch(conn, batch)
            })
        })
    }

    /// Sweeps aged terminal entries from both queues and compacts their
    /// journals.
    ///
    /// # Errors
    ///
    /// Returns an error if a sweep or compaction fails.
    pub fn run_cleanup(&self) -> EngineResult<CleanupStats> {
        let offer_entries_removed = self.offer_queue.sweep()?;
        self.offer_queue.compact()?;
        let shipment_entries_removed = self.shipment_queue.sweep()?;
        self.shipment_queue.compact()?;

        Ok(CleanupStats {
            offer_entries_removed,
            shipment_entries_removed,
        })
    }

    fn reenqueue_catalog(&self, connection: &Connection) -> EngineResult<usize> {
        let mut enqueued = 0;
        for entity in self.host.offer_ids()? {
            if !connection.rules.in_scope(EntityKind::Offer, entity) {
                continue;
            }
            self.offer_queue.enqueue(&connection.id, entity)?;
            enqueued += 1;
        }
        Ok(enqueued)
    }

    /// Drains one queue for one connection in bounded batches.
    ///
    /// The drain stops when the queue has nothing claimable, after a
    /// whole-batch failure, or once a batch hands back an entity this run
    /// already processed (entries re-queued by a per-item rejection wait
    /// for the next run instead of spinning here).
    fn drain_queue<F>(
        &self,
        queue: &WorkQueue,
        connection: &Connection,
        send: F,
    ) -> ConnectionReport
    where
        F: Fn(&Connection, &ExportBatch) -> EngineResult<BatchStats>,
    {
        let mut report = ConnectionReport::new(connection.id.clone());

        if let Some(problem) = credential_problem(connection) {
            tracing::warn!(
                connection = %connection.id,
                problem,
                "skipping misconfigured connection"
            );
            report.error = Some(problem);
            return report;
        }

        let mut seen: HashSet<EntityId> = HashSet::new();
        loop {
            let batch = match queue.claim_batch(&connection.id, self.config.batch_size) {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(e) => {
                    report.error = Some(e.to_string());
                    break;
                }
            };

            let repeat = batch.entries.iter().any(|e| seen.contains(&e.entity));
            seen.extend(batch.entries.iter().map(|e| e.entity));

            match send(connection, &batch) {
                Ok(stats) => {
                    report.succeeded += stats.exported;
                    report.failed += stats.rejected;
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::warn!(
                        connection = %connection.id,
                        batch = %batch.id,
                        entries = batch.len(),
                        retryable,
                        error = %e,
                        "batch export failed"
                    );
                    report.failed += batch.len();
                    report.error = Some(e.to_string());
                    if let Err(mark_err) = queue.mark_failed(&batch, retryable) {
                        // The claim stays in flight; stale reclamation
                        // will recover it.
                        tracing::error!(
                            connection = %connection.id,
                            error = %mark_err,
                            "failed to record batch failure"
                        );
                    }
                    break;
                }
            }

            if repeat {
                break;
            }
        }

        report
    }

    fn send_offer_batch(
        &self,
        connection: &Connection,
        batch: &ExportBatch,
        full_payload: bool,
    ) -> EngineResult<BatchStats> {
        let live = self.live_offers(batch)?;
        if live.is_empty() {
            return Ok(BatchStats::default());
        }

        let rules = &connection.rules;
        let sent: Vec<EntityId> = live.iter().map(|s| s.entity).collect();
        let outcome = if full_payload {
            let items: Vec<CatalogItem> = live
                .iter()
                .map(|s| CatalogItem {
                    entity: s.entity,
                    title: s.title.clone(),
                    sku: s.sku.clone(),
                    stock: rules.map_stock(s.stock),
                    price_cents: rules.map_price_cents(s.price_cents),
                    currency: s.currency.clone(),
                })
                .collect();
            self.api.update_catalog(&connection.credentials, &items)?
        } else {
            let updates: Vec<OfferUpdate> = live
                .iter()
                .map(|s| OfferUpdate {
                    entity: s.entity,
                    stock: rules.map_stock(s.stock),
                    price_cents: rules.map_price_cents(s.price_cents),
                })
                .collect();
            self.api.update_offers(&connection.credentials, &updates)?
        };

        self.apply_outcome(&self.offer_queue, &batch.connection, &sent, &outcome)
    }

    fn send_shipment_batch(
        &self,
        connection: &Connection,
        batch: &ExportBatch,
    ) -> EngineResult<BatchStats> {
        let mut updates = Vec::with_capacity(batch.len());
        for entry in &batch.entries {
            match self.host.shipment(entry.entity)? {
                Some(snapshot) => updates.push(ShipmentUpdate {
                    entity: snapshot.entity,
                    external_order_id: snapshot.external_order_id,
                    carrier: snapshot.carrier,
                    tracking_code: snapshot.tracking_code,
                }),
                None => {
                    tracing::debug!(
                        connection = %batch.connection,
                        entity = %entry.entity,
                        "shipment vanished from host store"
                    );
                    self.shipment_queue
                        .mark_entry_done(&batch.connection, entry.entity)?;
                }
            }
        }
        if updates.is_empty() {
            return Ok(BatchStats::default());
        }

        let sent: Vec<EntityId> = updates.iter().map(|u| u.entity).collect();
        let outcome = self
            .api
            .update_shipments(&connection.credentials, &updates)?;

        self.apply_outcome(&self.shipment_queue, &batch.connection, &sent, &outcome)
    }

    fn live_offers(&self, batch: &ExportBatch) -> EngineResult<Vec<OfferSnapshot>> {
        let mut live = Vec::with_capacity(batch.len());
        for entry in &batch.entries {
            match self.host.offer(entry.entity)? {
                Some(snapshot) => live.push(snapshot),
                None => {
                    tracing::debug!(
                        connection = %batch.connection,
                        entity = %entry.entity,
                        "offer vanished from host store"
                    );
                    self.offer_queue
                        .mark_entry_done(&batch.connection, entry.entity)?;
                }
            }
        }
        Ok(live)
    }

    /// Applies a per-item batch outcome to the queue: accepted entries
    /// become done, rejected ones go back through the retry policy.
    fn apply_outcome(
        &self,
        queue: &WorkQueue,
        connection: &ConnectionId,
        sent: &[EntityId],
        outcome: &BatchOutcome,
    ) -> EngineResult<BatchStats> {
        let rejected: HashMap<EntityId, String> = outcome
            .rejected()
            .into_iter()
            .map(|(entity, reason)| (entity, reason.to_string()))
            .collect();

        let mut stats = BatchStats::default();
        for &entity in sent {
            match rejected.get(&entity) {
                Some(reason) => {
                    tracing::warn!(
                        %connection,
                        %entity,
                        reason,
                        "entry rejected by marketplace"
                    );
                    queue.mark_entry_failed(connection, entity, true)?;
                    stats.rejected += 1;
                }
                None => {
                    queue.mark_entry_done(connection, entity)?;
                    stats.exported += 1;
                }
            }
        }
        Ok(stats)
    }
}

fn credential_problem(connection: &Connection) -> Option<String> {
    let credentials = &connection.credentials;
    if credentials.public_key.is_empty() || credentials.secret_key.is_empty() {
        return Some("connection has no API key pair".into());
    }
    if credentials.endpoint.is_empty() {
        return Some("connection has no API endpoint".into());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryHost, OfferSnapshot, ShipmentSnapshot};
    use marketsync_api::{MockFailure, MockMarketplaceApi};
    use marketsync_core::{Credentials, EntryStatus, ExportRules, QueueConfig, RetryPolicy};
    use std::time::Duration;

    fn connection(id: &str) -> Connection {
        Connection {
            id: ConnectionId::new(id),
            name: id.into(),
            active: true,
            credentials: Credentials {
                public_key: format!("{id}-pk"),
                secret_key: format!("{id}-sk"),
                endpoint: "http://marketplace.example".into(),
            },
            rules: ExportRules::default(),
        }
    }

    fn offer(entity: u64, stock: u32, price_cents: u64) -> OfferSnapshot {
        OfferSnapshot {
            entity: EntityId::new(entity),
            title: format!("Offer {entity}"),
            sku: format!("SKU-{entity}"),
            stock,
            price_cents,
            currency: "EUR".into(),
        }
    }

    fn queue_config() -> QueueConfig {
        QueueConfig::default()
            .with_dedup_window(Duration::ZERO)
            .with_retry(RetryPolicy::new(5).with_initial_delay(Duration::ZERO))
            .with_flush_on_write(false)
    }

    struct Rig {
        registry: Arc<ConnectionRegistry>,
        offer_queue: Arc<WorkQueue>,
        shipment_queue: Arc<WorkQueue>,
        api: Arc<MockMarketplaceApi>,
        host: Arc<MemoryHost>,
    }

    impl Rig {
        fn new(connections: Vec<Connection>) -> Self {
            Self {
                registry: Arc::new(
                    ConnectionRegistry::from_connections(connections).unwrap(),
                ),
                offer_queue: Arc::new(
                    WorkQueue::in_memory(EntityKind::Offer, queue_config()).unwrap(),
                ),
                shipment_queue: Arc::new(
                    WorkQueue::in_memory(EntityKind::Shipment, queue_config()).unwrap(),
                ),
                api: Arc::new(MockMarketplaceApi::new()),
                host: Arc::new(MemoryHost::new()),
            }
        }

        fn orchestrator(&self) -> ExportOrchestrator {
            ExportOrchestrator::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.offer_queue),
                Arc::clone(&self.shipment_queue),
                Arc::clone(&self.api) as Arc<dyn MarketplaceApi>,
                Arc::clone(&self.host) as Arc<dyn HostCatalog>,
                EngineConfig::default().with_batch_size(10),
            )
        }
    }

    #[test]
    fn queued_export_drains_and_marks_done() {
        let rig = Rig::new(vec![connection("amazon")]);
        let amazon = ConnectionId::new("amazon");
        rig.host.put_offer(offer(1, 5, 1000));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();

        let summary = rig.orchestrator().run_queued_offer_export();

        assert!(summary.is_success());
        assert_eq!(summary.total_succeeded(), 1);
        assert_eq!(
            rig.offer_queue.status_of(&amazon, EntityId::new(1)),
            Some(EntryStatus::Done)
        );
        assert_eq!(rig.api.offer_calls().len(), 1);
    }

    #[test]
    fn export_applies_connection_mapping_rules() {
        let mut conn = connection("amazon");
        conn.rules = ExportRules {
            stock_offset: -2,
            price_markup_bps: 1000, // +10%
            ..ExportRules::default()
        };
        let rig = Rig::new(vec![conn]);
        let amazon = ConnectionId::new("amazon");
        rig.host.put_offer(offer(1, 5, 1000));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();

        rig.orchestrator().run_queued_offer_export();

        let calls = rig.api.offer_calls();
        assert_eq!(calls[0].1[0].stock, 3);
        assert_eq!(calls[0].1[0].price_cents, 1100);
    }

    #[test]
    fn vanished_offer_is_marked_done_without_a_call() {
        let rig = Rig::new(vec![connection("amazon")]);
        let amazon = ConnectionId::new("amazon");
        rig.offer_queue.enqueue(&amazon, EntityId::new(9)).unwrap();

        let summary = rig.orchestrator().run_queued_offer_export();

        assert!(summary.is_success());
        assert_eq!(
            rig.offer_queue.status_of(&amazon, EntityId::new(9)),
            Some(EntryStatus::Done)
        );
        assert!(rig.api.offer_calls().is_empty());
    }

    #[test]
    fn partial_rejection_splits_the_batch() {
        let rig = Rig::new(vec![connection("amazon")]);
        let amazon = ConnectionId::new("amazon");
        rig.host.put_offer(offer(1, 1, 100));
        rig.host.put_offer(offer(2, 1, 100));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();
        rig.offer_queue.enqueue(&amazon, EntityId::new(2)).unwrap();
        rig.api.reject_entity("amazon-pk", EntityId::new(2), "missing EAN");

        let summary = rig.orchestrator().run_queued_offer_export();

        assert!(!summary.is_success());
        assert_eq!(
            rig.offer_queue.status_of(&amazon, EntityId::new(1)),
            Some(EntryStatus::Done)
        );
        assert_eq!(
            rig.offer_queue.status_of(&amazon, EntityId::new(2)),
            Some(EntryStatus::Pending)
        );
        assert_eq!(rig.offer_queue.attempts_of(&amazon, EntityId::new(2)), Some(1));
    }

    #[test]
    fn connection_failure_does_not_block_sibling() {
        let rig = Rig::new(vec![connection("amazon"), connection("ebay")]);
        let amazon = ConnectionId::new("amazon");
        let ebay = ConnectionId::new("ebay");
        rig.host.put_offer(offer(1, 1, 100));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();
        rig.offer_queue.enqueue(&ebay, EntityId::new(1)).unwrap();
        rig.api.fail("amazon-pk", MockFailure::Timeout);

        let summary = rig.orchestrator().run_queued_offer_export();

        assert_eq!(summary.exit_code(), 1);
        assert_eq!(
            rig.offer_queue.status_of(&amazon, EntityId::new(1)),
            Some(EntryStatus::Pending)
        );
        assert_eq!(rig.offer_queue.attempts_of(&amazon, EntityId::new(1)), Some(1));
        assert_eq!(
            rig.offer_queue.status_of(&ebay, EntityId::new(1)),
            Some(EntryStatus::Done)
        );
        assert!(summary.report_for(&ebay).unwrap().is_success());
    }

    #[test]
    fn non_retryable_failure_is_terminal() {
        let rig = Rig::new(vec![connection("amazon")]);
        let amazon = ConnectionId::new("amazon");
        rig.host.put_offer(offer(1, 1, 100));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();
        rig.api.fail("amazon-pk", MockFailure::AuthRejected);

        rig.orchestrator().run_queued_offer_export();

        assert_eq!(
            rig.offer_queue.status_of(&amazon, EntityId::new(1)),
            Some(EntryStatus::Failed)
        );
    }

    #[test]
    fn full_export_reenqueues_the_in_scope_catalog() {
        let mut conn = connection("amazon");
        conn.rules = ExportRules {
            excluded_entities: vec![EntityId::new(2)],
            ..ExportRules::default()
        };
        let rig = Rig::new(vec![conn]);
        rig.host.put_offer(offer(1, 1, 100));
        rig.host.put_offer(offer(2, 1, 100));
        rig.host.put_offer(offer(3, 1, 100));

        let summary = rig.orchestrator().run_catalog_export(CatalogExportMode::Full);

        assert!(summary.is_success());
        assert_eq!(summary.total_succeeded(), 2);
        let calls = rig.api.catalog_calls();
        assert_eq!(calls.len(), 1);
        let exported: Vec<u64> = calls[0].1.iter().map(|i| i.entity.as_u64()).collect();
        assert_eq!(exported, vec![1, 3]);
    }

    #[test]
    fn queued_catalog_export_sends_nothing_when_queue_is_empty() {
        let rig = Rig::new(vec![connection("amazon")]);
        rig.host.put_offer(offer(1, 1, 100));

        let summary = rig
            .orchestrator()
            .run_catalog_export(CatalogExportMode::Queued);

        assert!(summary.is_success());
        assert!(rig.api.catalog_calls().is_empty());
    }

    #[test]
    fn misconfigured_connection_is_skipped_with_error() {
        let mut broken = connection("broken");
        broken.credentials.endpoint = String::new();
        let rig = Rig::new(vec![broken, connection("ebay")]);
        let ebay = ConnectionId::new("ebay");
        rig.host.put_offer(offer(1, 1, 100));
        rig.offer_queue.enqueue(&ebay, EntityId::new(1)).unwrap();

        let summary = rig.orchestrator().run_queued_offer_export();

        assert_eq!(summary.exit_code(), 1);
        assert!(summary
            .report_for(&ConnectionId::new("broken"))
            .unwrap()
            .error
            .is_some());
        assert!(summary.report_for(&ebay).unwrap().is_success());
        // Nothing was claimed for the misconfigured connection.
        assert!(rig.api.offer_calls().iter().all(|(key, _)| key == "ebay-pk"));
    }

    #[test]
    fn shipment_export_sends_shipment_updates() {
        let rig = Rig::new(vec![connection("amazon")]);
        let amazon = ConnectionId::new("amazon");
        rig.host.put_shipment(ShipmentSnapshot {
            entity: EntityId::new(7),
            external_order_id: "EC-7".into(),
            carrier: "DHL".into(),
            tracking_code: Some("JD014600003".into()),
        });
        rig.shipment_queue.enqueue(&amazon, EntityId::new(7)).unwrap();

        let summary = rig.orchestrator().run_queued_shipment_export();

        assert!(summary.is_success());
        let calls = rig.api.shipment_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1[0].external_order_id, "EC-7");
        assert_eq!(
            rig.shipment_queue.status_of(&amazon, EntityId::new(7)),
            Some(EntryStatus::Done)
        );
    }

    #[test]
    fn rejected_entry_is_not_reclaimed_within_the_same_run() {
        // Zero backoff makes the rejected entry immediately pending again;
        // the drain must still terminate and leave it for the next run.
        let rig = Rig::new(vec![connection("amazon")]);
        let amazon = ConnectionId::new("amazon");
        rig.host.put_offer(offer(1, 1, 100));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();
        rig.api.reject_entity("amazon-pk", EntityId::new(1), "bad");

        let summary = rig.orchestrator().run_queued_offer_export();

        assert!(!summary.is_success());
        assert_eq!(rig.offer_queue.attempts_of(&amazon, EntityId::new(1)), Some(1));
    }

    #[test]
    fn cleanup_sweeps_terminal_entries() {
        // Retention of zero removes terminal entries immediately.
        let rig = Rig {
            offer_queue: Arc::new(
                WorkQueue::in_memory(
                    EntityKind::Offer,
                    queue_config().with_retention(Duration::ZERO),
                )
                .unwrap(),
            ),
            ..Rig::new(vec![connection("amazon")])
        };
        let amazon = ConnectionId::new("amazon");
        rig.host.put_offer(offer(1, 1, 100));
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();

        let orchestrator = rig.orchestrator();
        orchestrator.run_queued_offer_export();

        let stats = orchestrator.run_cleanup().unwrap();
        assert_eq!(stats.offer_entries_removed, 1);
        assert_eq!(rig.offer_queue.status_of(&amazon, EntityId::new(1)), None);
    }
}
