//! xdcstore CLI
//!
//! Command-line tools for catalog directories written by a file-backed
//! catalog client.
//!
//! # Commands
//!
//! - `replay` - Feed recorded host messages through a client
//! - `inspect` - List entries, states, cursor and flags
//! - `verify` - Check that cached binaries and rows agree
//! - `export` - Write a cached binary to disk

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// xdcstore catalog directory tools.
#[derive(Parser)]
#[command(name = "xdcstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the catalog directory
    #[arg(global = true, short, long, env = "XDCSTORE_DIR")]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long, env = "XDCSTORE_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed host messages from a JSON lines file through a client
    Replay {
        /// File with one host payload per line
        file: PathBuf,

        /// Stop at the first message that fails to commit
        #[arg(long)]
        stop_on_error: bool,
    },

    /// List entries, states, cursor and flags
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that cached binaries and rows agree
    Verify,

    /// Write the cached binary of an entry to disk
    Export {
        /// Entry id
        id: String,

        /// Output file, or a directory to write `<name>.xdc` into
        out: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            file,
            stop_on_error,
        } => {
            let store = cli.store.ok_or("Catalog directory required for replay")?;
            commands::replay::run(&store, &file, stop_on_error).await?;
        }
        Commands::Inspect { format } => {
            let store = cli.store.ok_or("Catalog directory required for inspect")?;
            commands::inspect::run(&store, &format).await?;
        }
        Commands::Verify => {
            let store = cli.store.ok_or("Catalog directory required for verify")?;
            commands::verify::run(&store).await?;
        }
        Commands::Export { id, out } => {
            let store = cli.store.ok_or("Catalog directory required for export")?;
            commands::export::run(&store, &id, &out).await?;
        }
        Commands::Version => {
            println!("xdcstore CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
