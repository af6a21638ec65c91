//! Caplet stripping CLI
//!
//! Batch runner for the caplet stripping library.
//!
//! # Commands
//!
//! - `caplet-strip strip --job <file>` - Strip caplet volatilities and write a JSON report
//! - `caplet-strip check --job <file>` - Validate and summarise a job without solving
//!
//! # Architecture
//!
//! As part of the **S**ervice layer, this crate only reads job files and
//! writes reports; all numerics live in `caplet_stripping`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod job;
mod report;

use config::{build_config, CliArgs};

/// Caplet volatility stripping from cap and floor quotes
#[derive(Parser)]
#[command(name = "caplet-strip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip caplet volatilities and write a JSON report
    Strip {
        /// Path to the TOML job file
        #[arg(short, long)]
        job: PathBuf,

        /// Report path (overrides the job file; stdout when neither is set)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate and summarise a job without solving
    Check {
        /// Path to the TOML job file
        #[arg(short, long)]
        job: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (job_path, output) = match &cli.command {
        Commands::Strip { job, output } => (job, output.clone()),
        Commands::Check { job } => (job, None),
    };
    let args = CliArgs {
        log_level: cli.log_level.clone(),
        output,
    };
    let job = build_config(job_path, &args)?;

    init_tracing(job.log_level.as_filter_str());
    tracing::info!(job = %job_path.display(), log_level = %job.log_level, "Job loaded");

    match cli.command {
        Commands::Strip { .. } => commands::strip::run(&job),
        Commands::Check { .. } => commands::check::run(&job),
    }
}
