//! trackfile CLI
//!
//! Command-line tools for inspecting transactional store files.
//!
//! # Commands
//!
//! - `inspect` - Display record count, size and keys
//! - `verify` - Decode the file and report duplicate keys
//! - `dump` - Print records as JSON

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trackfile_codec::Format;
use tracing_subscriber::EnvFilter;

/// trackfile command-line store tools.
#[derive(Parser)]
#[command(name = "trackfile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Record format (json, cbor); inferred from the file extension if omitted
    #[arg(global = true, long)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display record count, size and keys
    Inspect {
        /// Path to the store file
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Decode the file and report duplicate keys
    Verify {
        /// Path to the store file
        file: PathBuf,
    },

    /// Print records as JSON
    Dump {
        /// Path to the store file
        file: PathBuf,

        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip this many records first
        #[arg(short = 'O', long, default_value = "0")]
        offset: usize,
    },

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

    match cli.command {
        Commands::Inspect { file, output } => {
            commands::inspect::run(&file, cli.format, &output)?;
        }
        Commands::Verify { file } => {
            commands::verify::run(&file, cli.format)?;
        }
        Commands::Dump {
            file,
            limit,
            offset,
        } => {
            commands::dump::run(&file, cli.format, limit, offset)?;
        }
        Commands::Version => {
            println!("trackfile CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
