//! Test fixtures and pipeline helpers.
//!
//! Provides convenience constructors for connections, offers, and orders,
//! a fully wired in-memory pipeline, and a locked temp state directory.

use marketsync_api::{MarketplaceApi, MarketplaceOrder, MockMarketplaceApi};
use marketsync_core::{
    ChangeWatcher, Connection, ConnectionRegistry, Credentials, CursorStore, EntityId,
    EntityKind, ExportRules, QueueConfig, RetryPolicy, StateDir, WorkQueue,
};
use marketsync_engine::{
    EngineConfig, ExportOrchestrator, HostCatalog, MemoryHost, OfferSnapshot, OrderImporter,
    OrderSink, ShipmentSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Returns an active connection whose mock API key is `<id>-pk`.
pub fn test_connection(id: &str) -> Connection {
    Connection {
        id: id.into(),
        name: id.to_string(),
        active: true,
        credentials: Credentials {
            public_key: format!("{id}-pk"),
            secret_key: format!("{id}-sk"),
            endpoint: "http://marketplace.example".into(),
        },
        rules: ExportRules::default(),
    }
}

/// Returns an inactive connection.
pub fn inactive_connection(id: &str) -> Connection {
    Connection {
        active: false,
        ..test_connection(id)
    }
}

/// Returns a queue config with no dedup window, no retry backoff, and no
/// journal flushing, so tests control timing through thresholds alone.
pub fn fast_queue_config() -> QueueConfig {
    QueueConfig::default()
        .with_dedup_window(Duration::ZERO)
        .with_retry(RetryPolicy::new(5).with_initial_delay(Duration::ZERO))
        .with_flush_on_write(false)
}

/// Returns a sample offer snapshot for an entity.
pub fn sample_offer(entity: u64) -> OfferSnapshot {
    OfferSnapshot {
        entity: EntityId::new(entity),
        title: format!("Offer {entity}"),
        sku: format!("SKU-{entity}"),
        stock: 10,
        price_cents: 1999,
        currency: "EUR".into(),
    }
}

/// Returns a sample shipment snapshot for an entity.
pub fn sample_shipment(entity: u64, external_order_id: &str) -> ShipmentSnapshot {
    ShipmentSnapshot {
        entity: EntityId::new(entity),
        external_order_id: external_order_id.into(),
        carrier: "DHL".into(),
        tracking_code: Some(format!("TRK-{entity}")),
    }
}

/// Returns a sample marketplace order at a feed position.
pub fn sample_order(position: u64, external_id: &str) -> MarketplaceOrder {
    MarketplaceOrder {
        position,
        external_id: external_id.into(),
        buyer_name: "Test Buyer".into(),
        currency: "EUR".into(),
        total_cents: 1999,
        lines: Vec::new(),
    }
}

/// A fully wired pipeline over in-memory stores and a scripted API.
pub struct TestPipeline {
    /// The connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// The offer work queue.
    pub offer_queue: Arc<WorkQueue>,
    /// The shipment work queue.
    pub shipment_queue: Arc<WorkQueue>,
    /// The import cursor store.
    pub cursors: Arc<CursorStore>,
    /// The scripted marketplace.
    pub api: Arc<MockMarketplaceApi>,
    /// The in-memory host store.
    pub host: Arc<MemoryHost>,
    /// The offer change watcher.
    pub offer_watcher: ChangeWatcher,
    /// The shipment change watcher.
    pub shipment_watcher: ChangeWatcher,
}

impl TestPipeline {
    /// Wires a pipeline with [`fast_queue_config`].
    pub fn new(connections: Vec<Connection>) -> Self {
        Self::with_queue_config(connections, fast_queue_config())
    }

    /// Wires a pipeline with a custom queue config.
    pub fn with_queue_config(connections: Vec<Connection>, config: QueueConfig) -> Self {
        let registry = Arc::new(
            ConnectionRegistry::from_connections(connections)
                .expect("test connections must have unique ids"),
        );
        let offer_queue = Arc::new(
            WorkQueue::in_memory(EntityKind::Offer, config.clone())
                .expect("in-memory queue never fails to open"),
        );
        let shipment_queue = Arc::new(
            WorkQueue::in_memory(EntityKind::Shipment, config)
                .expect("in-memory queue never fails to open"),
        );
        let cursors =
            Arc::new(CursorStore::in_memory().expect("in-memory cursors never fail to open"));

        Self {
            offer_watcher: ChangeWatcher::new(
                EntityKind::Offer,
                Arc::clone(&registry),
                Arc::clone(&offer_queue),
            ),
            shipment_watcher: ChangeWatcher::new(
                EntityKind::Shipment,
                Arc::clone(&registry),
                Arc::clone(&shipment_queue),
            ),
            registry,
            offer_queue,
            shipment_queue,
            cursors,
            api: Arc::new(MockMarketplaceApi::new()),
            host: Arc::new(MemoryHost::new()),
        }
    }

    /// Builds an orchestrator over this pipeline.
    pub fn orchestrator(&self) -> ExportOrchestrator {
        ExportOrchestrator::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.offer_queue),
            Arc::clone(&self.shipment_queue),
            Arc::clone(&self.api) as Arc<dyn MarketplaceApi>,
            Arc::clone(&self.host) as Arc<dyn HostCatalog>,
            EngineConfig::default(),
        )
    }

    /// Builds an order importer over this pipeline.
    pub fn importer(&self) -> OrderImporter {
        OrderImporter::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.cursors),
            Arc::clone(&self.api) as Arc<dyn MarketplaceApi>,
            Arc::clone(&self.host) as Arc<dyn OrderSink>,
            EngineConfig::default(),
        )
    }
}

/// A locked temp state directory with automatic cleanup.
pub struct TestStateDir {
    /// The opened, locked state directory.
    pub state: StateDir,
    _temp: TempDir,
}

impl TestStateDir {
    /// Creates and locks a fresh state directory.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp directory");
        let state = StateDir::open(&temp.path().join("state"), true)
            .expect("failed to open state directory");
        Self { state, _temp: temp }
    }

    /// Writes a `connections.json` for the given connections.
    pub fn write_connections(&self, connections: &[Connection]) {
        let json = serde_json::to_string_pretty(connections)
            .expect("connections serialize to JSON");
        std::fs::write(self.state.connections_path(), json)
            .expect("failed to write connections.json");
    }
}

impl Default for TestStateDir {
    fn default() -> Self {
        Self::new()
    }
}
