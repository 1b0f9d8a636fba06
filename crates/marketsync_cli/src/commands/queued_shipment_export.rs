//! Queued shipment export command.

use crate::commands::print_summary;
use crate::context::AppContext;
use std::path::Path;

/// Exports queued shipments for every active connection.
pub fn run(state_dir: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let ctx = AppContext::open(state_dir)?;
    let summary = ctx.orchestrator.run_queued_shipment_export();
    Ok(print_summary(&summary))
}
