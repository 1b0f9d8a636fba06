//! File-backed host-store adapter.
//!
//! The real deployment implements `HostCatalog`/`OrderSink` against the
//! surrounding e-commerce platform. The CLI ships this adapter instead:
//! offers and shipments are read from JSON files an external process
//! maintains, and imported orders are written one file per external order
//! id, which makes the create idempotent by construction.

use marketsync_api::MarketplaceOrder;
use marketsync_core::{ConnectionId, EntityId};
use marketsync_engine::{
    EngineError, EngineResult, HostCatalog, OfferSnapshot, OrderCreate, OrderSink,
    ShipmentSnapshot,
};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const OFFERS_FILE: &str = "offers.json";
const SHIPMENTS_FILE: &str = "shipments.json";
const ORDERS_DIR: &str = "imported_orders";

/// Host-store adapter over JSON files in the state directory.
pub struct FileHost {
    offers_path: PathBuf,
    shipments_path: PathBuf,
    orders_dir: PathBuf,
}

impl FileHost {
    /// Opens the adapter, creating the imported-orders directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the orders directory cannot be created.
    pub fn open(state_dir: &Path) -> std::io::Result<Self> {
        let orders_dir = state_dir.join(ORDERS_DIR);
        fs::create_dir_all(&orders_dir)?;

        Ok(Self {
            offers_path: state_dir.join(OFFERS_FILE),
            shipments_path: state_dir.join(SHIPMENTS_FILE),
            orders_dir,
        })
    }

    fn load<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<Vec<T>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(EngineError::host(format!(
                    "read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_str(&text)
            .map_err(|e| EngineError::host(format!("parse {}: {e}", path.display())))
    }

    fn order_path(&self, connection: &ConnectionId, external_id: &str) -> PathBuf {
        let name = format!("{}_{}", sanitize(connection.as_str()), sanitize(external_id));
        self.orders_dir.join(format!("{name}.json"))
    }
}

impl HostCatalog for FileHost {
    fn offer(&self, entity: EntityId) -> EngineResult<Option<OfferSnapshot>> {
        let offers: Vec<OfferSnapshot> = Self::load(&self.offers_path)?;
        Ok(offers.into_iter().find(|o| o.entity == entity))
    }

    fn shipment(&self, entity: EntityId) -> EngineResult<Option<ShipmentSnapshot>> {
        let shipments: Vec<ShipmentSnapshot> = Self::load(&self.shipments_path)?;
        Ok(shipments.into_iter().find(|s| s.entity == entity))
    }

    fn offer_ids(&self) -> EngineResult<Vec<EntityId>> {
        let offers: Vec<OfferSnapshot> = Self::load(&self.offers_path)?;
        Ok(offers.into_iter().map(|o| o.entity).collect())
    }
}

impl OrderSink for FileHost {
    fn create_order(
        &self,
        connection: &ConnectionId,
        order: &MarketplaceOrder,
    ) -> EngineResult<OrderCreate> {
        let path = self.order_path(connection, &order.external_id);

        let file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(OrderCreate::AlreadyExists)
            }
            Err(e) => {
                return Err(EngineError::host(format!(
                    "create {}: {e}",
                    path.display()
                )))
            }
        };

        serde_json::to_writer_pretty(file, order)
            .map_err(|e| EngineError::host(format!("write {}: {e}", path.display())))?;

        Ok(OrderCreate::Created)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn offer(entity: u64) -> OfferSnapshot {
        OfferSnapshot {
            entity: EntityId::new(entity),
            title: format!("Offer {entity}"),
            sku: format!("SKU-{entity}"),
            stock: 1,
            price_cents: 100,
            currency: "EUR".into(),
        }
    }

    fn order(external_id: &str) -> MarketplaceOrder {
        MarketplaceOrder {
            position: 1,
            external_id: external_id.into(),
            buyer_name: "Buyer".into(),
            currency: "EUR".into(),
            total_cents: 100,
            lines: Vec::new(),
        }
    }

    #[test]
    fn missing_files_mean_an_empty_catalog() {
        let dir = tempdir().unwrap();
        let host = FileHost::open(dir.path()).unwrap();

        assert!(host.offer_ids().unwrap().is_empty());
        assert_eq!(host.offer(EntityId::new(1)).unwrap(), None);
        assert_eq!(host.shipment(EntityId::new(1)).unwrap(), None);
    }

    #[test]
    fn reads_offers_from_json() {
        let dir = tempdir().unwrap();
        let offers = vec![offer(1), offer(2)];
        fs::write(
            dir.path().join("offers.json"),
            serde_json::to_string(&offers).unwrap(),
        )
        .unwrap();

        let host = FileHost::open(dir.path()).unwrap();
        assert_eq!(host.offer_ids().unwrap().len(), 2);
        assert_eq!(host.offer(EntityId::new(2)).unwrap(), Some(offer(2)));
        assert_eq!(host.offer(EntityId::new(3)).unwrap(), None);
    }

    #[test]
    fn malformed_catalog_is_a_host_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("offers.json"), "{ nope ]").unwrap();

        let host = FileHost::open(dir.path()).unwrap();
        assert!(host.offer(EntityId::new(1)).is_err());
    }

    #[test]
    fn order_create_is_idempotent_on_disk() {
        let dir = tempdir().unwrap();
        let host = FileHost::open(dir.path()).unwrap();
        let amazon = ConnectionId::new("amazon");

        let first = host.create_order(&amazon, &order("EC-1")).unwrap();
        let second = host.create_order(&amazon, &order("EC-1")).unwrap();

        assert_eq!(first, OrderCreate::Created);
        assert_eq!(second, OrderCreate::AlreadyExists);

        let entries: Vec<_> = fs::read_dir(dir.path().join("imported_orders"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn order_ids_with_odd_characters_become_safe_file_names() {
        let dir = tempdir().unwrap();
        let host = FileHost::open(dir.path()).unwrap();
        let amazon = ConnectionId::new("amazon");

        let outcome = host
            .create_order(&amazon, &order("EC/2024:0001"))
            .unwrap();
        assert_eq!(outcome, OrderCreate::Created);
    }
}
