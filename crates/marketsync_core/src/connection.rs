//! Marketplace connection registry.
//!
//! Connections are configured by an external surface that writes
//! `connections.json`; the core only reads them. Every component that
//! needs credentials or activation state receives the registry by
//! reference, and drains work from a snapshot taken at the start of a
//! cycle so a connection cannot flip active mid-cycle.

use crate::error::{CoreError, CoreResult};
use crate::types::{ConnectionId, EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// API credentials for one marketplace connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Public API key.
    pub public_key: String,
    /// Secret API key.
    pub secret_key: String,
    /// Base endpoint of the marketplace API.
    pub endpoint: String,
}

/// Per-connection export settings.
///
/// These decide which entities are in scope for a connection and how its
/// stock and price figures are mapped before export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRules {
    /// Whether catalog offers are exported for this connection.
    pub export_offers: bool,
    /// Whether shipments are exported for this connection.
    pub export_shipments: bool,
    /// Entities excluded from export for this connection.
    pub excluded_entities: Vec<EntityId>,
    /// Offset applied to exported stock figures (e.g. a safety buffer of
    /// `-2` holds two units back from the marketplace).
    pub stock_offset: i64,
    /// Markup applied to exported prices, in basis points (100 = +1%).
    pub price_markup_bps: i64,
}

impl Default for ExportRules {
    fn default() -> Self {
        Self {
            export_offers: true,
            export_shipments: true,
            excluded_entities: Vec::new(),
            stock_offset: 0,
            price_markup_bps: 0,
        }
    }
}

impl ExportRules {
    /// Returns true if the entity is in scope for this connection.
    #[must_use]
    pub fn in_scope(&self, kind: EntityKind, entity: EntityId) -> bool {
        let kind_enabled = match kind {
            EntityKind::Offer => self.export_offers,
            EntityKind::Shipment => self.export_shipments,
        };
        kind_enabled && !self.excluded_entities.contains(&entity)
    }

    /// Maps a host-store stock figure through the connection's offset.
    #[must_use]
    pub fn map_stock(&self, stock: u32) -> u32 {
        let mapped = i64::from(stock) + self.stock_offset;
        mapped.max(0).min(i64::from(u32::MAX)) as u32
    }

    /// Maps a host-store price (in cents) through the connection's markup.
    #[must_use]
    pub fn map_price_cents(&self, price_cents: u64) -> u64 {
        let markup = (price_cents as i128 * self.price_markup_bps as i128) / 10_000;
        (price_cents as i128 + markup).max(0) as u64
    }
}

/// One configured marketplace connection (tenant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection id.
    pub id: ConnectionId,
    /// Operator-facing name.
    pub name: String,
    /// Only active connections are ever drained.
    pub active: bool,
    /// API credentials.
    pub credentials: Credentials,
    /// Export settings.
    #[serde(default)]
    pub rules: ExportRules,
}

/// The set of configured marketplace connections.
///
/// Immutable once loaded; reloading means constructing a new registry.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    /// Builds a registry from connections already in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if two connections share an id.
    pub fn from_connections(connections: Vec<Connection>) -> CoreResult<Self> {
        let mut seen = HashSet::new();
        for connection in &connections {
            if !seen.insert(connection.id.clone()) {
                return Err(CoreError::connection_config(format!(
                    "duplicate connection id: {}",
                    connection.id
                )));
            }
        }
        Ok(Self { connections })
    }

    /// Loads the registry from a `connections.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if two
    /// connections share an id.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let connections: Vec<Connection> = serde_json::from_str(&text).map_err(|e| {
            CoreError::connection_config(format!(
                "failed to parse {}: {e}",
                path.display()
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            total = connections.len(),
            active = connections.iter().filter(|c| c.active).count(),
            "connection registry loaded"
        );

        Self::from_connections(connections)
    }

    /// Returns an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            connections: Vec::new(),
        }
    }

    /// Returns a snapshot of the active connections.
    ///
    /// Drain cycles iterate this snapshot so the active set is consistent
    /// for the duration of one cycle.
    #[must_use]
    pub fn snapshot_active(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect()
    }

    /// Looks up a connection by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConnectionNotFound`] if no such connection is
    /// configured.
    pub fn get(&self, id: &ConnectionId) -> CoreResult<&Connection> {
        self.connections
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| CoreError::ConnectionNotFound { id: id.clone() })
    }

    /// Returns all configured connections, active or not.
    #[must_use]
    pub fn all(&self) -> &[Connection] {
        &self.connections
    }
}
