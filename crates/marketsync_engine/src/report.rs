//! Per-connection run reports and summaries.

use marketsync_core::{Connection, ConnectionId};
use std::time::{Duration, Instant};

/// Outcome of one operation for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    /// The connection this report is for.
    pub connection: ConnectionId,
    /// Entries exported or orders created.
    pub succeeded: usize,
    /// Entries or orders that failed during this run.
    pub failed: usize,
    /// A connection-level failure that ended the run early, if any.
    pub error: Option<String>,
}

impl ConnectionReport {
    /// Creates an empty report for a connection.
    #[must_use]
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            succeeded: 0,
            failed: 0,
            error: None,
        }
    }

    /// Returns true if nothing failed for this connection.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.error.is_none()
    }
}

/// Result of one operation across all active connections.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The operation that produced this summary.
    pub operation: &'static str,
    /// One report per active connection, ordered by connection id.
    pub reports: Vec<ConnectionReport>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunSummary {
    /// Returns true if every connection succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(ConnectionReport::is_success)
    }

    /// Returns the process exit status for this run: 0 on full success,
    /// 1 if any connection ended in an unrecovered error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Returns the total number of successes across connections.
    #[must_use]
    pub fn total_succeeded(&self) -> usize {
        self.reports.iter().map(|r| r.succeeded).sum()
    }

    /// Returns the total number of failures across connections.
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }

    /// Returns the report for one connection, if present.
    #[must_use]
    pub fn report_for(&self, connection: &ConnectionId) -> Option<&ConnectionReport> {
        self.reports.iter().find(|r| &r.connection == connection)
    }
}

/// Runs `per_connection` for every connection in the snapshot, in
/// parallel, and collects the reports into a summary.
///
/// This is the fault-isolation boundary: each connection runs on its own
/// thread, every failure is caught inside `per_connection` and recorded in
/// its report, and no connection's outcome can abort a sibling's run.
pub(crate) fn run_connections<F>(
    operation: &'static str,
    connections: &[Connection],
    per_connection: F,
) -> RunSummary
where
    F: Fn(&Connection) -> ConnectionReport + Sync,
{
    let start = Instant::now();

    let mut reports: Vec<ConnectionReport> = std::thread::scope(|scope| {
        let handles: Vec<_> = connections
            .iter()
            .map(|connection| {
                let per_connection = &per_connection;
                scope.spawn(move || {
                    let _span = tracing::info_span!(
                        "connection_run",
                        operation,
                        connection = %connection.id
                    )
                    .entered();
                    per_connection(connection)
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(connections)
            .map(|(handle, connection)| match handle.join() {
                Ok(report) => report,
                Err(_) => {
                    // A panic is a bug; record it instead of poisoning
                    // the sibling connections.
                    let mut report = ConnectionReport::new(connection.id.clone());
                    report.error = Some("connection run panicked".into());
                    report
                }
            })
            .collect()
    });

    reports.sort_by(|a, b| a.connection.cmp(&b.connection));

    let summary = RunSummary {
        operation,
        reports,
        duration: start.elapsed(),
    };

    tracing::info!(
        operation,
        connections = summary.reports.len(),
        succeeded = summary.total_succeeded(),
        failed = summary.total_failed(),
        success = summary.is_success(),
        "run finished"
    );

    summary
}
