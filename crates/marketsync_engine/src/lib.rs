//! # marketsync Engine
//!
//! Export orchestration and order import across marketplace connections.
//!
//! This crate provides:
//! - [`ExportOrchestrator`] drains the offer and shipment work queues per
//!   active connection and calls the marketplace API, with full
//!   per-connection fault isolation
//! - [`OrderImporter`] pages marketplace orders into the host store behind
//!   a per-connection cursor that never skips a failed order
//! - [`Scheduler`] is a timer driving the same operations on fixed
//!   cadences; there is no separate scheduled code path
//! - [`HostCatalog`] and [`OrderSink`] are the seams the host e-commerce
//!   platform implements, with [`MemoryHost`] for tests
//!
//! ## Fault isolation
//!
//! Connections are processed from one registry snapshot per run, in
//! parallel. Every per-connection and per-entity failure is caught at the
//! connection boundary, classified as retryable or terminal, recorded in a
//! [`ConnectionReport`], and reflected in the run's exit code. One
//! connection's failure never aborts or starves a sibling connection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod host;
mod importer;
mod orchestrator;
mod report;
mod scheduler;

pub use config::{EngineConfig, ScheduleConfig};
pub use error::{EngineError, EngineResult};
pub use host::{HostCatalog, MemoryHost, OfferSnapshot, OrderCreate, OrderSink, ShipmentSnapshot};
pub use importer::OrderImporter;
pub use orchestrator::{CatalogExportMode, CleanupStats, ExportOrchestrator};
pub use report::{ConnectionReport, RunSummary};
pub use scheduler::{Scheduler, SchedulerHandle};
