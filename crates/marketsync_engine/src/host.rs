//! Host-store access traits.
//!
//! The surrounding e-commerce platform owns offers, shipments, and orders;
//! the engine only reads entity snapshots for export and creates orders on
//! import. These traits are the seam the host platform implements.

use crate::error::{EngineError, EngineResult};
use marketsync_api::MarketplaceOrder;
use marketsync_core::{ConnectionId, EntityId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A point-in-time view of one catalog offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSnapshot {
    /// Host-store entity id.
    pub entity: EntityId,
    /// Product title.
    pub title: String,
    /// Merchant SKU.
    pub sku: String,
    /// Raw stock, before connection mapping rules.
    pub stock: u32,
    /// Raw price in cents, before connection mapping rules.
    pub price_cents: u64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// A point-in-time view of one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentSnapshot {
    /// Host-store entity id.
    pub entity: EntityId,
    /// The marketplace order the shipment fulfills.
    pub external_order_id: String,
    /// Carrier name.
    pub carrier: String,
    /// Tracking code, when available.
    pub tracking_code: Option<String>,
}

/// Read access to the host store's catalog and shipments.
pub trait HostCatalog: Send + Sync {
    /// Returns the current snapshot of an offer, or `None` if it no longer
    /// exists in the host store.
    ///
    /// # Errors
    ///
    /// Returns an error if the host store cannot be read.
    fn offer(&self, entity: EntityId) -> EngineResult<Option<OfferSnapshot>>;

    /// Returns the current snapshot of a shipment, or `None` if it no
    /// longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the host store cannot be read.
    fn shipment(&self, entity: EntityId) -> EngineResult<Option<ShipmentSnapshot>>;

    /// Returns every offer entity id in the host store. Used by the full
    /// catalog export to re-enqueue the entire in-scope catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the host store cannot be read.
    fn offer_ids(&self) -> EngineResult<Vec<EntityId>>;
}

/// Result of an idempotent order create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCreate {
    /// A new host-store order was created.
    Created,
    /// An order with this external id already exists; absorbed as a no-op.
    AlreadyExists,
}

/// Write access for materializing marketplace orders in the host store.
pub trait OrderSink: Send + Sync {
    /// Creates a host-store order for a marketplace order.
    ///
    /// Must be idempotent on the order's external id: a second create for
    /// the same id returns [`OrderCreate::AlreadyExists`] without touching
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the order could not be created. The importer
    /// holds the cursor back so the order is retried on the next run.
    fn create_order(
        &self,
        connection: &ConnectionId,
        order: &MarketplaceOrder,
    ) -> EngineResult<OrderCreate>;
}

#[derive(Default)]
struct MemoryHostState {
    offers: BTreeMap<EntityId, OfferSnapshot>,
    shipments: BTreeMap<EntityId, ShipmentSnapshot>,
    created_orders: Vec<(ConnectionId, MarketplaceOrder)>,
    failing_orders: HashSet<String>,
}

/// An in-memory host store for tests.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<MemoryHostState>,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an offer.
    pub fn put_offer(&self, offer: OfferSnapshot) {
        self.state.lock().offers.insert(offer.entity, offer);
    }

    /// Inserts or replaces a shipment.
    pub fn put_shipment(&self, shipment: ShipmentSnapshot) {
        self.state.lock().shipments.insert(shipment.entity, shipment);
    }

    /// Removes an offer, simulating a deletion in the host store.
    pub fn remove_offer(&self, entity: EntityId) {
        self.state.lock().offers.remove(&entity);
    }

    /// Makes `create_order` fail for the given external order id.
    pub fn fail_order(&self, external_id: &str) {
        self.state.lock().failing_orders.insert(external_id.to_string());
    }

    /// Clears a scripted order failure.
    pub fn recover_order(&self, external_id: &str) {
        self.state.lock().failing_orders.remove(external_id);
    }

    /// Returns the external ids of all created orders, in creation order.
    #[must_use]
    pub fn created_order_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .created_orders
            .iter()
            .map(|(_, order)| order.external_id.clone())
            .collect()
    }
}

impl HostCatalog for MemoryHost {
    fn offer(&self, entity: EntityId) -> EngineResult<Option<OfferSnapshot>> {
        Ok(self.state.lock().offers.get(&entity).cloned())
    }

    fn shipment(&self, entity: EntityId) -> EngineResult<Option<ShipmentSnapshot>> {
        Ok(self.state.lock().shipments.get(&entity).cloned())
    }

    fn offer_ids(&self) -> EngineResult<Vec<EntityId>> {
        Ok(self.state.lock().offers.keys().copied().collect())
    }
}

impl OrderSink for MemoryHost {
    fn create_order(
        &self,
        connection: &ConnectionId,
        order: &MarketplaceOrder,
    ) -> EngineResult<OrderCreate> {
        let mut state = self.state.lock();

        if state.failing_orders.contains(&order.external_id) {
            return Err(EngineError::host(format!(
                "scripted failure creating order {}",
                order.external_id
            )));
        }

        let exists = state
            .created_orders
            .iter()
            .any(|(conn, existing)| {
                conn == connection && existing.external_id == order.external_id
            });
        if exists {
            return Ok(OrderCreate::AlreadyExists);
        }

        state
            .created_orders
            .push((connection.clone(), order.clone()));
        Ok(OrderCreate::Created)
    }
}
