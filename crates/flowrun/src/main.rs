//! flowrun - trigger Prefect deployment runs from the command line.
//!
//! Main entry point for the flowrun CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, run};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// flowrun - trigger Prefect deployment runs and wait for their outcome
#[derive(Parser)]
#[command(name = "flowrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to load on top of the discovered ones
    #[arg(long, global = true, env = "FLOWRUN_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a flow run from a deployment and optionally wait for it
    Run(run::RunArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable with --json
    let filter = if cli.verbose {
        "flowrun=debug,flowrun_client=debug,flowrun_config=debug,info"
    } else {
        "flowrun=info,flowrun_client=info,warn"
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(cli.verbose)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_path: cli.config,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
