//! Marketplace order import.
//!
//! For each active connection the importer pages through orders newer than
//! the connection's cursor, creates them in the host store (idempotent by
//! external order id), and advances the cursor to the highest contiguous
//! success. The cursor never moves past a failed order, so the next run
//! retries it; orders after a failure are still attempted, relying on the
//! idempotent create to absorb the duplicates that produces.

use crate::config::EngineConfig;
use crate::host::{OrderCreate, OrderSink};
use crate::report::{run_connections, ConnectionReport, RunSummary};
use marketsync_api::MarketplaceApi;
use marketsync_core::{Connection, ConnectionRegistry, CursorStore};
use std::sync::Arc;

/// Imports marketplace orders into the host store, per connection.
pub struct OrderImporter {
    registry: Arc<ConnectionRegistry>,
    cursors: Arc<CursorStore>,
    api: Arc<dyn MarketplaceApi>,
    sink: Arc<dyn OrderSink>,
    config: EngineConfig,
}

impl OrderImporter {
    /// Creates an importer over the given cursor store, API client, and
    /// host-store sink.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        cursors: Arc<CursorStore>,
        api: Arc<dyn MarketplaceApi>,
        sink: Arc<dyn OrderSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            cursors,
            api,
            sink,
            config,
        }
    }

    /// Imports new orders for every active connection.
    pub fn run_order_import(&self) -> RunSummary {
        let connections = self.registry.snapshot_active();
        run_connections("order-import", &connections, |connection| {
            self.import_for(connection)
        })
    }

    fn import_for(&self, connection: &Connection) -> ConnectionReport {
        let mut report = ConnectionReport::new(connection.id.clone());
        let mut cursor = self.cursors.get(&connection.id);

        loop {
            let page = match self.api.list_orders(
                &connection.credentials,
                cursor,
                self.config.order_page_size,
            ) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        connection = %connection.id,
                        error = %e,
                        "order listing failed"
                    );
                    report.error = Some(e.to_string());
                    return report;
                }
            };

            if page.orders.is_empty() {
                return report;
            }

            let mut watermark = cursor;
            let mut stalled = false;
            for order in &page.orders {
                match self.sink.create_order(&connection.id, order) {
                    Ok(OrderCreate::Created) => {
                        report.succeeded += 1;
                        if !stalled {
                            watermark = order.position;
                        }
                    }
                    Ok(OrderCreate::AlreadyExists) => {
                        tracing::debug!(
                            connection = %connection.id,
                            external_id = %order.external_id,
                            "duplicate order absorbed"
                        );
                        if !stalled {
                            watermark = order.position;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            connection = %connection.id,
                            external_id = %order.external_id,
                            position = order.position,
                            error = %e,
                            "order import failed"
                        );
                        report.failed += 1;
                        stalled = true;
                    }
                }
            }

            if let Err(e) = self.cursors.advance(&connection.id, watermark) {
                report.error = Some(e.to_string());
                return report;
            }

            // A failed order holds the cursor back; paging on from here
            // would refetch the same window, so leave the rest to the
            // next run.
            if stalled || !page.has_more {
                return report;
            }
            cursor = watermark;
        }
    }
}
