//! Catalog export command.

use crate::commands::print_summary;
use crate::context::AppContext;
use marketsync_engine::CatalogExportMode;
use std::path::Path;

/// Runs the catalog export; `full` re-enqueues the entire in-scope
/// catalog before draining.
pub fn run(state_dir: &Path, full: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let ctx = AppContext::open(state_dir)?;
    let mode = if full {
        CatalogExportMode::Full
    } else {
        CatalogExportMode::Queued
    };
    let summary = ctx.orchestrator.run_catalog_export(mode);
    Ok(print_summary(&summary))
}
