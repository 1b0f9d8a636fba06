//! # marketsync API
//!
//! The outbound surface to the marketplace-aggregation API.
//!
//! This crate provides:
//! - Payload types for catalog, offer, and shipment batch updates
//! - Per-item batch outcomes, so partially rejected batches can be split
//! - Paginated, position-ordered order listings
//! - The [`MarketplaceApi`] client trait
//! - A JSON-over-HTTP client behind an [`HttpClient`] abstraction
//! - A scriptable [`MockMarketplaceApi`] for tests
//!
//! The wire schema is owned by the marketplace; this crate's contract is
//! only: send a batch, receive success/failure per item, tolerate
//! partial-batch rejection, and classify every failure as retryable or
//! not so the work queues can apply their retry policy.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod error;
mod http;
mod messages;
mod mock;

pub use api::MarketplaceApi;
pub use error::{ApiError, ApiResult};
pub use http::{HttpClient, HttpError, HttpMarketplaceApi, LoopbackClient, LoopbackServer};
pub use messages::{
    BatchOutcome, CatalogItem, ItemOutcome, ItemResult, MarketplaceOrder, OfferUpdate,
    OrderLine, OrderPage, ShipmentUpdate,
};
pub use mock::{MockFailure, MockMarketplaceApi};
