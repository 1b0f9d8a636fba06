//! JSON-over-HTTP marketplace client.
//!
//! The actual HTTP transport is abstracted behind [`HttpClient`] so
//! different implementations can be plugged in (a TCP client, a loopback
//! client for tests). The marketplace endpoint comes from each
//! connection's credentials, so one client serves all connections.

use crate::api::MarketplaceApi;
use crate::error::{ApiError, ApiResult};
use crate::messages::{BatchOutcome, CatalogItem, OfferUpdate, OrderPage, ShipmentUpdate};
use marketsync_core::Credentials;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A failed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// What went wrong.
    pub message: String,
    /// Whether the request can be retried (connection failures, timeouts,
    /// 5xx responses) or not (4xx responses).
    pub retryable: bool,
}

impl HttpError {
    /// Creates a retryable HTTP error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable HTTP error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual transport. Implementations
/// must enforce a per-request timeout and report it as a retryable error.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] classified as retryable or not.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError>;
}

const CATALOG_PATH: &str = "/catalog/update";
const OFFERS_PATH: &str = "/offers/update";
const SHIPMENTS_PATH: &str = "/shipments/update";
const ORDERS_PATH: &str = "/orders/list";

/// Request envelope carrying the connection's credentials.
#[derive(Serialize)]
struct RequestEnvelope<'a, T: Serialize> {
    public_key: &'a str,
    secret_key: &'a str,
    payload: T,
}

/// Response envelope returned by every endpoint.
#[derive(Deserialize)]
struct ResponseEnvelope<T> {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    result: Option<T>,
}

#[derive(Serialize)]
struct ListOrdersPayload {
    after: u64,
    limit: u32,
}

/// JSON-over-HTTP implementation of [`MarketplaceApi`].
pub struct HttpMarketplaceApi<C: HttpClient> {
    client: C,
}

impl<C: HttpClient> HttpMarketplaceApi<C> {
    /// Creates a client over the given transport.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    fn post_json<Req, Res>(
        &self,
        credentials: &Credentials,
        path: &str,
        payload: Req,
    ) -> ApiResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let envelope = RequestEnvelope {
            public_key: &credentials.public_key,
            secret_key: &credentials.secret_key,
            payload,
        };
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| ApiError::Protocol(format!("failed to encode request: {e}")))?;

        let url = format!("{}{path}", credentials.endpoint.trim_end_matches('/'));
        let response_body = self.client.post(&url, body).map_err(|e| {
            tracing::debug!(url = %url, error = %e.message, "marketplace call failed");
            ApiError::Transport {
                message: e.message,
                retryable: e.retryable,
            }
        })?;

        let response: ResponseEnvelope<Res> = serde_json::from_slice(&response_body)
            .map_err(|e| ApiError::Protocol(format!("failed to decode response: {e}")))?;

        if !response.success {
            return Err(ApiError::Server(
                response.error.unwrap_or_else(|| "request failed".into()),
            ));
        }

        response
            .result
            .ok_or_else(|| ApiError::Protocol("successful response without a result".into()))
    }
}

impl<C: HttpClient> MarketplaceApi for HttpMarketplaceApi<C> {
    fn update_catalog(
        &self,
        credentials: &Credentials,
        items: &[CatalogItem],
    ) -> ApiResult<BatchOutcome> {
        self.post_json(credentials, CATALOG_PATH, items)
    }

    fn update_offers(
        &self,
        credentials: &Credentials,
        updates: &[OfferUpdate],
    ) -> ApiResult<BatchOutcome> {
        self.post_json(credentials, OFFERS_PATH, updates)
    }

    fn update_shipments(
        &self,
        credentials: &Credentials,
        updates: &[ShipmentUpdate],
    ) -> ApiResult<BatchOutcome> {
        self.post_json(credentials, SHIPMENTS_PATH, updates)
    }

    fn list_orders(
        &self,
        credentials: &Credentials,
        after: u64,
        limit: u32,
    ) -> ApiResult<OrderPage> {
        self.post_json(credentials, ORDERS_PATH, ListOrdersPayload { after, limit })
    }
}

/// A loopback client routing requests directly to an in-process handler.
///
/// Useful for testing the HTTP client path without network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a loopback client over the given handler.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

/// A handler for loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a POST request to `path` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] to simulate a transport failure.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, HttpError>;
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError> {
        // Strip the scheme and host so handlers see only the path.
        let path = url
            .find("://")
            .and_then(|i| url[i + 3..].find('/').map(|j| &url[i + 3 + j..]))
            .unwrap_or(url);
        self.server.handle_post(path, &body)
    }
}
