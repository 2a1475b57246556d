//! Logtail CLI
//!
//! Command-line tools for inspecting transaction log directories.
//!
//! # Commands
//!
//! - `tail` - Determine and print the log tail state
//! - `checkpoints` - List readable checkpoint records

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Transaction log tail inspection tools.
#[derive(Parser)]
#[command(name = "logtail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the log directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Determine the log tail state and print it
    Tail {
        /// Continue past corruption instead of stopping at it
        #[arg(short, long)]
        best_effort: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List readable checkpoint records, oldest first
    Checkpoints {
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

    match cli.command {
        Commands::Tail {
            best_effort,
            format,
        } => {
            let path = cli.path.ok_or("Log directory path required for tail")?;
            commands::tail::run(&path, best_effort, &format)?;
        }
        Commands::Checkpoints { format } => {
            let path = cli
                .path
                .ok_or("Log directory path required for checkpoints")?;
            commands::checkpoints::run(&path, &format)?;
        }
        Commands::Version => {
            println!("logtail {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
