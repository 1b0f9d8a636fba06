//! Order import command.

use crate::commands::print_summary;
use crate::context::AppContext;
use std::path::Path;

/// Imports new marketplace orders for every active connection.
pub fn run(state_dir: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let ctx = AppContext::open(state_dir)?;
    let summary = ctx.importer.run_order_import();
    Ok(print_summary(&summary))
}
