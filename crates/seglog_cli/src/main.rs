//! seglog CLI
//!
//! Command-line tools for inspecting segmented journals on disk.
//!
//! Every command opens segment files read-only in spirit: nothing is
//! truncated, repaired or deleted, so a damaged journal can be examined
//! before the owning process recovers it.
//!
//! # Commands
//!
//! - `inspect` - Display per-segment statistics
//! - `verify` - Check frame checksums and index continuity
//! - `dump` - Print entries for debugging

mod commands;

use clap::{Parser, Subcommand};
use seglog_journal::DEFAULT_MAX_ENTRY_SIZE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// seglog command-line journal tools.
#[derive(Parser)]
#[command(name = "seglog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the journal directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Largest entry the journal was written with
    #[arg(global = true, long, default_value_t = DEFAULT_MAX_ENTRY_SIZE)]
    max_entry_size: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display per-segment statistics
    Inspect {
        /// Journal name (segment file prefix)
        #[arg(short, long)]
        name: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify journal integrity
    Verify {
        /// Journal name (segment file prefix)
        #[arg(short, long)]
        name: String,
    },

    /// Dump journal entries for debugging
    Dump {
        /// Journal name (segment file prefix)
        #[arg(short, long)]
        name: String,

        /// First index to print
        #[arg(long, default_value = "1")]
        from: u64,

        /// Maximum number of entries to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = cli.path.unwrap_or_else(|| PathBuf::from("."));
    match cli.command {
        Commands::Inspect { name, format } => {
            commands::inspect::run(&path, &name, cli.max_entry_size, &format)?;
        }
        Commands::Verify { name } => {
            commands::verify::run(&path, &name, cli.max_entry_size)?;
        }
        Commands::Dump {
            name,
            from,
            limit,
            format,
        } => {
            commands::dump::run(&path, &name, cli.max_entry_size, from, limit, &format)?;
        }
        Commands::Version => {
            println!("seglog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("seglog journal v{}", seglog_journal::VERSION);
        }
    }

    Ok(())
}
