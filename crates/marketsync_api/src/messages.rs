//! Payload types exchanged with the marketplace API.
//!
//! The wire format is JSON. Batch updates return a per-item outcome so a
//! partially rejected batch can mark accepted entries done while only the
//! rejected entries are retried.

use marketsync_core::EntityId;
use serde::{Deserialize, Serialize};

/// One full catalog item, sent by the catalog export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Host-store entity id of the offer.
    pub entity: EntityId,
    /// Product title.
    pub title: String,
    /// Merchant SKU.
    pub sku: String,
    /// Stock after the connection's mapping rules.
    pub stock: u32,
    /// Price in cents after the connection's mapping rules.
    pub price_cents: u64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// A stock/price update for an already listed offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferUpdate {
    /// Host-store entity id of the offer.
    pub entity: EntityId,
    /// Stock after the connection's mapping rules.
    pub stock: u32,
    /// Price in cents after the connection's mapping rules.
    pub price_cents: u64,
}

/// A shipment notification for a marketplace order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentUpdate {
    /// Host-store entity id of the shipment.
    pub entity: EntityId,
    /// The marketplace order the shipment belongs to.
    pub external_order_id: String,
    /// Carrier name.
    pub carrier: String,
    /// Tracking code, when the carrier provides one.
    pub tracking_code: Option<String>,
}

/// Outcome for a single item in a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The marketplace accepted the item.
    Accepted,
    /// The marketplace rejected the item.
    Rejected {
        /// The marketplace's rejection reason.
        reason: String,
    },
}

/// Per-item result of a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// The entity the result is for.
    pub entity: EntityId,
    /// Accept or reject.
    pub outcome: ItemOutcome,
}

/// Result of one batch update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One result per submitted item, in submission order.
    pub results: Vec<ItemResult>,
}

impl BatchOutcome {
    /// Builds an outcome that accepts every given entity.
    #[must_use]
    pub fn accept_all(entities: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            results: entities
                .into_iter()
                .map(|entity| ItemResult {
                    entity,
                    outcome: ItemOutcome::Accepted,
                })
                .collect(),
        }
    }

    /// Returns true if every item was accepted.
    #[must_use]
    pub fn all_accepted(&self) -> bool {
        self.results
            .iter()
            .all(|r| matches!(r.outcome, ItemOutcome::Accepted))
    }

    /// Returns the accepted entity ids.
    #[must_use]
    pub fn accepted(&self) -> Vec<EntityId> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Accepted))
            .map(|r| r.entity)
            .collect()
    }

    /// Returns the rejected entity ids with their reasons.
    #[must_use]
    pub fn rejected(&self) -> Vec<(EntityId, &str)> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                ItemOutcome::Rejected { reason } => Some((r.entity, reason.as_str())),
                ItemOutcome::Accepted => None,
            })
            .collect()
    }
}

/// One line of a marketplace order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Merchant SKU of the ordered product.
    pub sku: String,
    /// Ordered quantity.
    pub quantity: u32,
    /// Unit price in cents.
    pub unit_price_cents: u64,
}

/// An order placed on the marketplace, to be imported into the host store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceOrder {
    /// Position in the marketplace's stable delivery order. Cursors record
    /// positions, so they must be strictly increasing per connection.
    pub position: u64,
    /// The marketplace's order id; host-store creation is idempotent on it.
    pub external_id: String,
    /// Buyer display name.
    pub buyer_name: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Order total in cents.
    pub total_cents: u64,
    /// Order lines.
    pub lines: Vec<OrderLine>,
}

/// One page of marketplace orders, delivered in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    /// The orders, ascending by position.
    pub orders: Vec<MarketplaceOrder>,
    /// True if more orders exist past this page.
    pub has_more: bool,
}
