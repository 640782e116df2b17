//! Vizdiff CLI - visual regression diffing of staging vs production screenshots.
//!
//! # Usage
//!
//! ```bash
//! # Diff a single pair
//! vizdiff diff staging.png production.png --out-dir ./out
//!
//! # Diff every captured page of a run
//! vizdiff run --project shop --run nightly-42 --output results.jsonl
//!
//! # View configuration
//! vizdiff config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Vizdiff - visual regression diffing of staging vs production screenshots.
#[derive(Parser, Debug)]
#[command(name = "vizdiff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Diff a single staging/production screenshot pair
    Diff(cli::diff::DiffArgs),

    /// Diff every captured page of a project run
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match vizdiff_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `vizdiff config path`."
            );
            vizdiff_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Vizdiff v{}", vizdiff_core::VERSION);

    match cli.command {
        Commands::Diff(args) => cli::diff::execute(args, config).await,
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
