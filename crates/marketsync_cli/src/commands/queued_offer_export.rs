//! Queued offer export command.

use crate::commands::print_summary;
use crate::context::AppContext;
use std::path::Path;

/// Exports queued stock/price offer updates for every active connection.
pub fn run(state_dir: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let ctx = AppContext::open(state_dir)?;
    let summary = ctx.orchestrator.run_queued_offer_export();
    Ok(print_summary(&summary))
}
