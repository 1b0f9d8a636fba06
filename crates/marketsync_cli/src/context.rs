//! Shared wiring for the CLI commands.

use crate::host::FileHost;
use crate::net::TcpHttpClient;
use marketsync_api::{HttpMarketplaceApi, MarketplaceApi};
use marketsync_core::{
    ConnectionRegistry, CursorStore, EntityKind, QueueConfig, StateDir, WorkQueue,
};
use marketsync_engine::{EngineConfig, ExportOrchestrator, HostCatalog, OrderImporter, OrderSink};
use marketsync_store::FileJournal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Per-call timeout for marketplace requests.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a command needs: the locked state directory, the durable
/// stores, and the engine components wired over them.
pub struct AppContext {
    /// Holds the exclusive state-directory lock for the process lifetime.
    #[allow(dead_code)]
    state: StateDir,
    /// The export orchestrator.
    pub orchestrator: Arc<ExportOrchestrator>,
    /// The order importer.
    pub importer: Arc<OrderImporter>,
}

impl AppContext {
    /// Opens the state directory and wires the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory is locked by another
    /// process, a journal is corrupt, or `connections.json` is malformed.
    pub fn open(state_dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let state = StateDir::open(state_dir, true)?;

        let registry = if state.connections_path().exists() {
            ConnectionRegistry::load(&state.connections_path())?
        } else {
            tracing::warn!(
                path = %state.connections_path().display(),
                "no connections.json; no connection will be drained"
            );
            ConnectionRegistry::empty()
        };
        let registry = Arc::new(registry);

        let queue_config = QueueConfig::default();
        let offer_queue = Arc::new(WorkQueue::open(
            Box::new(FileJournal::open(&state.offer_queue_path())?),
            EntityKind::Offer,
            queue_config.clone(),
        )?);
        let shipment_queue = Arc::new(WorkQueue::open(
            Box::new(FileJournal::open(&state.shipment_queue_path())?),
            EntityKind::Shipment,
            queue_config,
        )?);
        let cursors = Arc::new(CursorStore::open(
            Box::new(FileJournal::open(&state.cursors_path())?),
            true,
        )?);

        let host = Arc::new(FileHost::open(state.path())?);
        let api: Arc<dyn MarketplaceApi> =
            Arc::new(HttpMarketplaceApi::new(TcpHttpClient::new(API_TIMEOUT)));

        let engine_config = EngineConfig::default();
        let orchestrator = Arc::new(ExportOrchestrator::new(
            Arc::clone(&registry),
            offer_queue,
            shipment_queue,
            Arc::clone(&api),
            Arc::clone(&host) as Arc<dyn HostCatalog>,
            engine_config.clone(),
        ));
        let importer = Arc::new(OrderImporter::new(
            registry,
            cursors,
            api,
            host as Arc<dyn OrderSink>,
            engine_config,
        ));

        Ok(Self {
            state,
            orchestrator,
            importer,
        })
    }
}
