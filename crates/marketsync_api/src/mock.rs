//! A scriptable in-memory marketplace for tests.

use crate::api::MarketplaceApi;
use crate::error::{ApiError, ApiResult};
use crate::messages::{
    BatchOutcome, CatalogItem, ItemOutcome, ItemResult, MarketplaceOrder, OfferUpdate,
    OrderPage, ShipmentUpdate,
};
use marketsync_core::{Credentials, EntityId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// How a scripted connection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Every call times out.
    Timeout,
    /// Every call fails with a retryable transport error.
    Disconnected,
    /// Every call is rejected as unauthenticated.
    AuthRejected,
}

impl MockFailure {
    fn to_error(self) -> ApiError {
        match self {
            Self::Timeout => ApiError::Timeout,
            Self::Disconnected => ApiError::transport_retryable("connection refused"),
            Self::AuthRejected => ApiError::Authentication("invalid key pair".into()),
        }
    }
}

#[derive(Default)]
struct MockState {
    // All scripted behavior is keyed by the connection's public key.
    failures: HashMap<String, MockFailure>,
    rejects: HashMap<String, HashMap<EntityId, String>>,
    orders: HashMap<String, Vec<MarketplaceOrder>>,
    catalog_calls: Vec<(String, Vec<CatalogItem>)>,
    offer_calls: Vec<(String, Vec<OfferUpdate>)>,
    shipment_calls: Vec<(String, Vec<ShipmentUpdate>)>,
}

/// An in-memory [`MarketplaceApi`] whose behavior is scripted per
/// connection (keyed by public key). Records every call for assertions.
#[derive(Default)]
pub struct MockMarketplaceApi {
    state: Mutex<MockState>,
}

impl MockMarketplaceApi {
    /// Creates a mock that accepts everything and has no orders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call for the given public key fail.
    pub fn fail(&self, public_key: &str, failure: MockFailure) {
        self.state
            .lock()
            .failures
            .insert(public_key.to_string(), failure);
    }

    /// Clears a scripted failure, restoring normal behavior.
    pub fn recover(&self, public_key: &str) {
        self.state.lock().failures.remove(public_key);
    }

    /// Makes batch updates reject the given entity with a reason.
    pub fn reject_entity(&self, public_key: &str, entity: EntityId, reason: &str) {
        self.state
            .lock()
            .rejects
            .entry(public_key.to_string())
            .or_default()
            .insert(entity, reason.to_string());
    }

    /// Adds an order to the scripted order feed for a connection.
    pub fn push_order(&self, public_key: &str, order: MarketplaceOrder) {
        let mut state = self.state.lock();
        let orders = state.orders.entry(public_key.to_string()).or_default();
        orders.push(order);
        orders.sort_by_key(|o| o.position);
    }

    /// Returns every recorded catalog call as `(public_key, items)`.
    #[must_use]
    pub fn catalog_calls(&self) -> Vec<(String, Vec<CatalogItem>)> {
        self.state.lock().catalog_calls.clone()
    }

    /// Returns every recorded offer update call.
    #[must_use]
    pub fn offer_calls(&self) -> Vec<(String, Vec<OfferUpdate>)> {
        self.state.lock().offer_calls.clone()
    }

    /// Returns every recorded shipment update call.
    #[must_use]
    pub fn shipment_calls(&self) -> Vec<(String, Vec<ShipmentUpdate>)> {
        self.state.lock().shipment_calls.clone()
    }

    fn check_failure(&self, credentials: &Credentials) -> ApiResult<()> {
        let state = self.state.lock();
        match state.failures.get(&credentials.public_key) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn outcome_for(&self, credentials: &Credentials, entities: &[EntityId]) -> BatchOutcome {
        let state = self.state.lock();
        let rejects = state.rejects.get(&credentials.public_key);
        BatchOutcome {
            results: entities
                .iter()
                .map(|&entity| ItemResult {
                    entity,
                    outcome: match rejects.and_then(|r| r.get(&entity)) {
                        Some(reason) => ItemOutcome::Rejected {
                            reason: reason.clone(),
                        },
                        None => ItemOutcome::Accepted,
                    },
                })
                .collect(),
        }
    }
}

impl MarketplaceApi for MockMarketplaceApi {
    fn update_catalog(
        &self,
        credentials: &Credentials,
        items: &[CatalogItem],
    ) -> ApiResult<BatchOutcome> {
        self.check_failure(credentials)?;
        let entities: Vec<EntityId> = items.iter().map(|i| i.entity).collect();
        self.state
            .lock()
            .catalog_calls
            .push((credentials.public_key.clone(), items.to_vec()));
        Ok(self.outcome_for(credentials, &entities))
    }

    fn update_offers(
        &self,
        credentials: &Credentials,
        updates: &[OfferUpdate],
    ) -> ApiResult<BatchOutcome> {
        self.check_failure(credentials)?;
        let entities: Vec<EntityId> = updates.iter().map(|u| u.entity).collect();
        self.state
            .lock()
            .offer_calls
            .push((credentials.public_key.clone(), updates.to_vec()));
        Ok(self.outcome_for(credentials, &entities))
    }

    fn update_shipments(
        &self,
        credentials: &Credentials,
        updates: &[ShipmentUpdate],
    ) -> ApiResult<BatchOutcome> {
        self.check_failure(credentials)?;
        let entities: Vec<EntityId> = updates.iter().map(|u| u.entity).collect();
        self.state
            .lock()
            .shipment_calls
            .push((credentials.public_key.clone(), updates.to_vec()));
        Ok(self.outcome_for(credentials, &entities))
    }

    fn list_orders(
        &self,
        credentials: &Credentials,
        after: u64,
        limit: u32,
    ) -> ApiResult<OrderPage> {
        self.check_failure(credentials)?;

        let state = self.state.lock();
        let all = state
            .orders
            .get(&credentials.public_key)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let newer: Vec<&MarketplaceOrder> =
            all.iter().filter(|o| o.position > after).collect();
        let page: Vec<MarketplaceOrder> = newer
            .iter()
            .take(limit as usize)
            .map(|&o| o.clone())
            .collect();

        Ok(OrderPage {
            has_more: newer.len() > page.len(),
            orders: page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(key: &str) -> Credentials {
        Credentials {
            public_key: key.into(),
            secret_key: "secret".into(),
            endpoint: "http://marketplace.example".into(),
        }
    }

    fn order(position: u64, external_id: &str) -> MarketplaceOrder {
        MarketplaceOrder {
            position,
            external_id: external_id.into(),
            buyer_name: "Buyer".into(),
            currency: "EUR".into(),
            total_cents: 1000,
            lines: Vec::new(),
        }
    }

    #[test]
    fn accepts_by_default_and_records_calls() {
        let mock = MockMarketplaceApi::new();
        let creds = credentials("amazon");

        let updates = vec![OfferUpdate {
            entity: EntityId::new(1),
            stock: 5,
            price_cents: 100,
        }];
        let outcome = mock.update_offers(&creds, &updates).unwrap();

        assert!(outcome.all_accepted());
        assert_eq!(mock.offer_calls().len(), 1);
        assert_eq!(mock.offer_calls()[0].0, "amazon");
    }

    #[test]
    fn scripted_failure_and_recovery() {
        let mock = MockMarketplaceApi::new();
        let creds = credentials("amazon");

        mock.fail("amazon", MockFailure::Timeout);
        let err = mock.update_offers(&creds, &[]).unwrap_err();
        assert!(matches!(err, ApiError::Timeout));

        mock.recover("amazon");
        assert!(mock.update_offers(&creds, &[]).is_ok());
    }

    #[test]
    fn failures_are_scoped_to_the_connection() {
        let mock = MockMarketplaceApi::new();
        mock.fail("amazon", MockFailure::Disconnected);

        assert!(mock.update_offers(&credentials("amazon"), &[]).is_err());
        assert!(mock.update_offers(&credentials("ebay"), &[]).is_ok());
    }

    #[test]
    fn rejects_only_the_scripted_entity() {
        let mock = MockMarketplaceApi::new();
        let creds = credentials("amazon");
        mock.reject_entity("amazon", EntityId::new(2), "missing EAN");

        let updates = vec![
            OfferUpdate {
                entity: EntityId::new(1),
                stock: 1,
                price_cents: 100,
            },
            OfferUpdate {
                entity: EntityId::new(2),
                stock: 1,
                price_cents: 100,
            },
        ];
        let outcome = mock.update_offers(&creds, &updates).unwrap();

        assert_eq!(outcome.accepted(), vec![EntityId::new(1)]);
        assert_eq!(outcome.rejected(), vec![(EntityId::new(2), "missing EAN")]);
    }

    #[test]
    fn order_listing_pages_by_position() {
        let mock = MockMarketplaceApi::new();
        let creds = credentials("amazon");
        for position in 1..=5 {
            mock.push_order("amazon", order(position, &format!("EC-{position}")));
        }

        let page = mock.list_orders(&creds, 0, 2).unwrap();
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[0].position, 1);
        assert!(page.has_more);

        let page = mock.list_orders(&creds, 3, 10).unwrap();
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[0].position, 4);
        assert!(!page.has_more);
    }
}
