//! Periodic scheduling of the synchronization operations.
//!
//! The scheduler is purely a timer: each enabled operation runs on its own
//! cadence by calling the same public orchestrator/importer methods the
//! manual trigger surface calls, with identical semantics. Operations are
//! synchronous and run on the blocking pool; stopping waits for any
//! in-flight run to reach its natural boundary.

use crate::config::ScheduleConfig;
use crate::importer::OrderImporter;
use crate::orchestrator::{CatalogExportMode, ExportOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Drives the five synchronization operations on fixed cadences.
pub struct Scheduler {
    orchestrator: Arc<ExportOrchestrator>,
    importer: Arc<OrderImporter>,
    config: ScheduleConfig,
}

impl Scheduler {
    /// Creates a scheduler over the given orchestrator and importer.
    #[must_use]
    pub fn new(
        orchestrator: Arc<ExportOrchestrator>,
        importer: Arc<OrderImporter>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            orchestrator,
            importer,
            config,
        }
    }

    /// Starts the enabled periodic tasks.
    ///
    /// Each task first fires one period after start, then repeats. Must be
    /// called from within a tokio runtime.
    #[must_use]
    pub fn start(&self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        if let Some(period) = self.config.catalog_export {
            let orchestrator = Arc::clone(&self.orchestrator);
            tasks.push(spawn_periodic("catalog-export", period, stop_rx.clone(), move || {
                orchestrator.run_catalog_export(CatalogExportMode::Queued);
            }));
        }
        if let Some(period) = self.config.offer_export {
            let orchestrator = Arc::clone(&self.orchestrator);
            tasks.push(spawn_periodic(
                "queued-offer-export",
                period,
                stop_rx.clone(),
                move || {
                    orchestrator.run_queued_offer_export();
                },
            ));
        }
        if let Some(period) = self.config.shipment_export {
            let orchestrator = Arc::clone(&self.orchestrator);
            tasks.push(spawn_periodic(
                "queued-shipment-export",
                period,
                stop_rx.clone(),
                move || {
                    orchestrator.run_queued_shipment_export();
                },
            ));
        }
        if let Some(period) = self.config.order_import {
            let importer = Arc::clone(&self.importer);
            tasks.push(spawn_periodic("order-import", period, stop_rx.clone(), move || {
                importer.run_order_import();
            }));
        }
        if let Some(period) = self.config.cleanup {
            let orchestrator = Arc::clone(&self.orchestrator);
            tasks.push(spawn_periodic("cleanup", period, stop_rx, move || {
                if let Err(e) = orchestrator.run_cleanup() {
                    tracing::error!(error = %e, "scheduled cleanup failed");
                }
            }));
        }

        tracing::info!(tasks = tasks.len(), "scheduler started");
        SchedulerHandle { stop_tx, tasks }
    }
}

/// Handle for stopping a running scheduler.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals every periodic task to stop and waits for them to finish.
    ///
    /// An operation that is mid-run completes before its task exits, so no
    /// claimed batch is abandoned by a graceful stop.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("scheduler stopped");
    }
}

fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    mut stop: watch::Receiver<bool>,
    operation: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let operation = Arc::new(operation);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately;
        // consume it so the first run happens one period after start.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let operation = Arc::clone(&operation);
                    if tokio::task::spawn_blocking(move || operation())
                        .await
                        .is_err()
                    {
                        tracing::error!(task = name, "scheduled task panicked");
                    }
                }
                _ = stop.changed() => break,
            }
        }

        tracing::debug!(task = name, "periodic task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::host::{HostCatalog, MemoryHost, OfferSnapshot};
    use marketsync_api::{MarketplaceApi, MockMarketplaceApi};
    use marketsync_core::{
        Connection, ConnectionId, ConnectionRegistry, Credentials, CursorStore, EntityId,
        EntityKind, ExportRules, QueueConfig, RetryPolicy, WorkQueue,
    };

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

    struct Rig {
        offer_queue: Arc<WorkQueue>,
        api: Arc<MockMarketplaceApi>,
        scheduler: Scheduler,
    }

    fn rig(config: ScheduleConfig) -> Rig {
        let queue_config = QueueConfig::default()
            .with_dedup_window(Duration::ZERO)
            .with_retry(RetryPolicy::new(5).with_initial_delay(Duration::ZERO))
            .with_flush_on_write(false);

        let registry = Arc::new(
            ConnectionRegistry::from_connections(vec![connection("amazon")]).unwrap(),
        );
        let offer_queue =
            Arc::new(WorkQueue::in_memory(EntityKind::Offer, queue_config.clone()).unwrap());
        let shipment_queue =
            Arc::new(WorkQueue::in_memory(EntityKind::Shipment, queue_config).unwrap());
        let cursors = Arc::new(CursorStore::in_memory().unwrap());
        let api = Arc::new(MockMarketplaceApi::new());
        let host = Arc::new(MemoryHost::new());
        host.put_offer(OfferSnapshot {
            entity: EntityId::new(1),
            title: "Widget".into(),
            sku: "W-1".into(),
            stock: 2,
            price_cents: 500,
            currency: "EUR".into(),
        });

        let orchestrator = Arc::new(ExportOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&offer_queue),
            shipment_queue,
            Arc::clone(&api) as Arc<dyn MarketplaceApi>,
            Arc::clone(&host) as Arc<dyn HostCatalog>,
            EngineConfig::default(),
        ));
        let importer = Arc::new(OrderImporter::new(
            registry,
            cursors,
            Arc::clone(&api) as Arc<dyn MarketplaceApi>,
            host,
            EngineConfig::default(),
        ));

        Rig {
            offer_queue,
            api,
            scheduler: Scheduler::new(orchestrator, importer, config),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduled_export_drains_the_queue() {
        let rig = rig(
            ScheduleConfig::disabled().with_offer_export(Duration::from_millis(20)),
        );
        let amazon = ConnectionId::new("amazon");
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();

        let handle = rig.scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        assert!(!rig.api.offer_calls().is_empty());
        assert_eq!(rig.offer_queue.pending_for(&amazon), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_ends_the_cadence() {
        let rig = rig(
            ScheduleConfig::disabled().with_offer_export(Duration::from_millis(20)),
        );

        let handle = rig.scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;

        let calls_after_stop = rig.api.offer_calls().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rig.api.offer_calls().len(), calls_after_stop);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_operations_never_fire() {
        let rig = rig(ScheduleConfig::disabled());
        let amazon = ConnectionId::new("amazon");
        rig.offer_queue.enqueue(&amazon, EntityId::new(1)).unwrap();

        let handle = rig.scheduler.start();
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.stop().await;

        assert!(rig.api.offer_calls().is_empty());
        assert_eq!(rig.offer_queue.pending_for(&amazon), 1);
    }
}
