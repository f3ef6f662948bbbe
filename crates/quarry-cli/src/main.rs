//! Quarry CLI - Command-line interface for Quarry
//!
//! This is the main entry point for users interacting with Quarry.
//! It resolves a file set, runs the analysis pipeline and reports on it.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(author = "Quarry Contributors")]
#[command(version)]
#[command(about = "Structure, dependencies and code quality of a repository", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which files to analyze and how.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Invocation root; relative source roots and exclude patterns are
    /// resolved against it
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Include rule 'EXTS:PATH', e.g. 'py,pyi:src' (repeatable)
    #[arg(short, long = "include", value_name = "EXTS:PATH")]
    pub includes: Vec<String>,

    /// Exclude rule 'EXTS:PATTERN', e.g. '*:tests' (repeatable)
    #[arg(short, long = "exclude", value_name = "EXTS:PATTERN")]
    pub excludes: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Repository display name
    #[arg(long)]
    pub name: Option<String>,

    /// Skip complexity, maintainability and code smell metrics
    #[arg(long)]
    pub no_metrics: bool,

    /// Number of worker threads (default: all cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Abort the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the repository and print a summary
    Collect {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Write the full analysis as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List analyzed files with their descriptions and dependencies
    Files {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Only list files that import or are imported by others
        #[arg(long)]
        linked: bool,
    },

    /// Show the outline and metrics of a single file
    Inspect {
        /// The file to inspect, relative to the root
        file: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Collect { selection, output } => commands::collect(&selection, output.as_deref()),
        Commands::Files { selection, linked } => commands::files(&selection, linked),
        Commands::Inspect { file, selection } => commands::inspect(&selection, &file),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
