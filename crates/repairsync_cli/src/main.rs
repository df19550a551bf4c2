//! repairsync CLI
//!
//! Command-line tools for a shop's local record store.
//!
//! # Commands
//!
//! - `status` - Per-table record counts and the sync cursor
//! - `import` - Load a JSON array of records into a table
//! - `normalize` - Repair date-string timestamps
//! - `sweep` - Delete aged delivered orders from the remote store
//! - `sync` - Run one sync cycle

mod commands;

use clap::{Args, Parser, Subcommand};
use repairsync_core::EntityKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// repairsync command-line tools.
#[derive(Parser)]
#[command(name = "repairsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Remote store connection flags.
#[derive(Args, Debug, Default)]
pub struct RemoteArgs {
    /// Remote base URL (defaults to $REPAIRSYNC_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Service key (defaults to $REPAIRSYNC_SERVICE_KEY)
    #[arg(long)]
    pub service_key: Option<String>,

    /// Bearer token of a signed-in user; without it nothing is pushed
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts and the sync cursor
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Import records from a JSON array file
    Import {
        /// Target table (customers, repair_orders, invoices, ...)
        #[arg(short, long)]
        kind: EntityKind,

        /// JSON file holding an array of objects
        file: PathBuf,
    },

    /// Convert date-string timestamps to epoch milliseconds
    Normalize {
        /// Tables to normalize (defaults to repair_orders)
        #[arg(short, long)]
        kind: Vec<EntityKind>,
    },

    /// Delete aged delivered orders from the remote store
    Sweep {
        /// List candidates without deleting anything
        #[arg(short, long)]
        dry_run: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Run one sync cycle
    Sync {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status { format } => {
            let path = cli.path.ok_or("Store path required for status")?;
            commands::status::run(&path, &format)?;
        }
        Commands::Import { kind, file } => {
            let path = cli.path.ok_or("Store path required for import")?;
            commands::import::run(&path, kind, &file)?;
        }
        Commands::Normalize { kind } => {
            let path = cli.path.ok_or("Store path required for normalize")?;
            commands::normalize::run(&path, &kind)?;
        }
        Commands::Sweep { dry_run, remote } => {
            let path = cli.path.ok_or("Store path required for sweep")?;
            commands::sweep::run(&path, dry_run, &remote).await?;
        }
        Commands::Sync { remote, format } => {
            let path = cli.path.ok_or("Store path required for sync")?;
            commands::sync::run(&path, &remote, &format).await?;
        }
        Commands::Version => {
            println!("repairsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("repairsync core v{}", repairsync_core::VERSION);
        }
    }

    Ok(())
}
