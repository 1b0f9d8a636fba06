//! Queue cleanup command.

use crate::context::AppContext;
use std::path::Path;

/// Removes aged terminal queue entries and compacts both journals.
pub fn run(state_dir: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let ctx = AppContext::open(state_dir)?;
    let stats = ctx.orchestrator.run_cleanup()?;

    println!("clean-logs:");
    println!(
        "  offer entries removed:    {}",
        stats.offer_entries_removed
    );
    println!(
        "  shipment entries removed: {}",
        stats.shipment_entries_removed
    );

    Ok(0)
}
