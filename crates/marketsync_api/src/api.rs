//! The marketplace API client trait.

use crate::error::ApiResult;
use crate::messages::{BatchOutcome, CatalogItem, OfferUpdate, OrderPage, ShipmentUpdate};
use marketsync_core::Credentials;

/// Outbound interface to the marketplace-aggregation API.
///
/// Implementations are connection-agnostic: credentials are passed per
/// call, so one client instance serves every configured connection. Calls
/// are blocking and bounded by a per-call timeout owned by the transport;
/// a timeout surfaces as a retryable error, never a panic or a hang.
pub trait MarketplaceApi: Send + Sync {
    /// Sends a batch of full catalog items.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails as a whole. Per-item rejections
    /// are not errors; they come back inside the [`BatchOutcome`].
    fn update_catalog(
        &self,
        credentials: &Credentials,
        items: &[CatalogItem],
    ) -> ApiResult<BatchOutcome>;

    /// Sends a batch of stock/price offer updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails as a whole.
    fn update_offers(
        &self,
        credentials: &Credentials,
        updates: &[OfferUpdate],
    ) -> ApiResult<BatchOutcome>;

    /// Sends a batch of shipment notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails as a whole.
    fn update_shipments(
        &self,
        credentials: &Credentials,
        updates: &[ShipmentUpdate],
    ) -> ApiResult<BatchOutcome>;

    /// Lists orders with a position strictly greater than `after`, in
    /// ascending position order, up to `limit` per page.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    fn list_orders(
        &self,
        credentials: &Credentials,
        after: u64,
        limit: u32,
    ) -> ApiResult<OrderPage>;
}
