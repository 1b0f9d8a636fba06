//! CLI command implementations.

pub mod catalog_export;
pub mod clean_logs;
pub mod order_import;
pub mod queued_offer_export;
pub mod queued_shipment_export;
pub mod schedule;

use marketsync_engine::RunSummary;

/// Prints a per-connection summary and returns the run's exit code.
pub fn print_summary(summary: &RunSummary) -> i32 {
    println!("{}:", summary.operation);

    if summary.reports.is_empty() {
        println!("  (no active connections)");
    }
    for report in &summary.reports {
        let status = if report.is_success() { "ok" } else { "FAILED" };
        print!(
            "  {:<24} {:>4} succeeded, {:>4} failed  [{status}]",
            report.connection.as_str(),
            report.succeeded,
            report.failed
        );
        match &report.error {
            Some(error) => println!("  {error}"),
            None => println!(),
        }
    }

    println!(
        "  total: {} succeeded, {} failed in {:?}",
        summary.total_succeeded(),
        summary.total_failed(),
        summary.duration
    );

    summary.exit_code()
}
