//! Daemon mode: run the scheduler until interrupted.

use crate::context::AppContext;
use marketsync_engine::{ScheduleConfig, Scheduler};
use std::path::Path;
use std::sync::Arc;

/// Runs every operation on its configured cadence until Ctrl-C.
pub fn run(state_dir: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let ctx = AppContext::open(state_dir)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let scheduler = Scheduler::new(
            Arc::clone(&ctx.orchestrator),
            Arc::clone(&ctx.importer),
            ScheduleConfig::default(),
        );
        let handle = scheduler.start();
        println!("scheduler running; press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        println!("stopping...");
        handle.stop().await;

        Ok::<(), std::io::Error>(())
    })?;

    Ok(0)
}
