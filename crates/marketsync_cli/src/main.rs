//! marketsync CLI
//!
//! Manual trigger surface for the synchronization operations.
//!
//! # Commands
//!
//! - `catalog-export` - Export queued offers as full catalog items
//! - `full-offer-export` - Re-enqueue and export the entire catalog
//! - `queued-offer-export` - Export queued stock/price updates
//! - `queued-shipment-export` - Export queued shipments
//! - `order-import` - Import new marketplace orders
//! - `clean-logs` - Sweep terminal queue entries and compact journals
//! - `schedule` - Run all operations on their cadences until Ctrl-C
//!
//! Every operation exits non-zero if any connection's run ended in an
//! unrecovered error, so cron and shell scripts can alert on it.

mod commands;
mod context;
mod host;
mod net;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// marketsync command-line trigger surface.
#[derive(Parser)]
#[command(name = "marketsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the state directory
    #[arg(global = true, short, long, default_value = "./marketsync-state")]
    state_dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export queued offers as full catalog items
    CatalogExport {
        /// Re-enqueue the entire in-scope catalog before draining
        #[arg(short, long)]
        full: bool,
    },

    /// Re-enqueue and export the entire in-scope catalog
    FullOfferExport,

    /// Export queued stock/price offer updates
    QueuedOfferExport,

    /// Export queued shipments
    QueuedShipmentExport,

    /// Import new marketplace orders
    OrderImport,

    /// Remove aged terminal queue entries and compact the journals
    CleanLogs,

    /// Run all operations on their configured cadences
    Schedule,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let exit = match cli.command {
        Commands::CatalogExport { full } => commands::catalog_export::run(&cli.state_dir, full)?,
        Commands::FullOfferExport => commands::catalog_export::run(&cli.state_dir, true)?,
        Commands::QueuedOfferExport => commands::queued_offer_export::run(&cli.state_dir)?,
        Commands::QueuedShipmentExport => {
            commands::queued_shipment_export::run(&cli.state_dir)?
        }
        Commands::OrderImport => commands::order_import::run(&cli.state_dir)?,
        Commands::CleanLogs => commands::clean_logs::run(&cli.state_dir)?,
        Commands::Schedule => commands::schedule::run(&cli.state_dir)?,
        Commands::Version => {
            println!("marketsync CLI v{}", env!("CARGO_PKG_VERSION"));
            0
        }
    };

    std::process::exit(exit);
}
