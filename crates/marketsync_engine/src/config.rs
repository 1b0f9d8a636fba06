//! Engine configuration.

use std::time::Duration;

/// Configuration for the export orchestrator and order importer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum queue entries claimed per API call.
    pub batch_size: usize,
    /// Maximum orders requested per listing page.
    pub order_page_size: u32,
}

impl EngineConfig {
    /// Sets the export batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the order listing page size.
    #[must_use]
    pub fn with_order_page_size(mut self, size: u32) -> Self {
        self.order_page_size = size;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            order_page_size: 100,
        }
    }
}

/// Cadences for the scheduled operations. `None` disables an operation.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Cadence of the queued catalog export.
    pub catalog_export: Option<Duration>,
    /// Cadence of the queued offer (stock/price) export.
    pub offer_export: Option<Duration>,
    /// Cadence of the queued shipment export.
    pub shipment_export: Option<Duration>,
    /// Cadence of the order import.
    pub order_import: Option<Duration>,
    /// Cadence of the queue cleanup sweep.
    pub cleanup: Option<Duration>,
}

impl ScheduleConfig {
    /// Returns a config with every operation disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            catalog_export: None,
            offer_export: None,
            shipment_export: None,
            order_import: None,
            cleanup: None,
        }
    }

    /// Sets the catalog export cadence.
    #[must_use]
    pub fn with_catalog_export(mut self, period: Duration) -> Self {
        self.catalog_export = Some(period);
        self
    }

    /// Sets the offer export cadence.
    #[must_use]
    pub fn with_offer_export(mut self, period: Duration) -> Self {
        self.offer_export = Some(period);
        self
    }

    /// Sets the shipment export cadence.
    #[must_use]
    pub fn with_shipment_export(mut self, period: Duration) -> Self {
        self.shipment_export = Some(period);
        self
    }

    /// Sets the order import cadence.
    #[must_use]
    pub fn with_order_import(mut self, period: Duration) -> Self {
        self.order_import = Some(period);
        self
    }

    /// Sets the cleanup cadence.
    #[must_use]
    pub fn with_cleanup(mut self, period: Duration) -> Self {
        self.cleanup = Some(period);
        self
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            catalog_export: Some(Duration::from_secs(3600)),
            offer_export: Some(Duration::from_secs(300)),
            shipment_export: Some(Duration::from_secs(300)),
            order_import: Some(Duration::from_secs(300)),
            cleanup: Some(Duration::from_secs(24 * 3600)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_builder() {
        let config = EngineConfig::default()
            .with_batch_size(10)
            .with_order_page_size(5);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.order_page_size, 5);
    }

    #[test]
    fn schedule_defaults_enable_everything() {
        let config = ScheduleConfig::default();
        assert!(config.catalog_export.is_some());
        assert!(config.offer_export.is_some());
        assert!(config.shipment_export.is_some());
        assert!(config.order_import.is_some());
        assert!(config.cleanup.is_some());
    }

    #[test]
    fn disabled_config_enables_nothing() {
        let config = ScheduleConfig::disabled();
        assert!(config.catalog_export.is_none());
        assert!(config.cleanup.is_none());
    }
}
