//! Solvency CLI - Exposure and settlement analytics over market snapshots
//!
//! Reads a snapshot of every market curve and user account, values the
//! aggregate trader exposure as if it were closed at once, and compares the
//! implied user claims against the vault balances.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod curves;
mod output;
mod summary;

use config::{FileConfig, Overrides, RunConfig};
use solvency_model::CloseOrder;

#[derive(Parser)]
#[command(name = "solvency")]
#[command(about = "Exposure and solvency analytics for constant product markets", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,

    /// Snapshot JSON file (overrides config)
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the per-market and solvency report
    Summary {
        /// Collateral held in the vault
        #[arg(long)]
        vault_balance: Option<f64>,

        /// Collateral already settled out
        #[arg(long)]
        total_settled_collateral: Option<f64>,

        /// Directory for the dated report file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print only, don't write the report file
        #[arg(long)]
        no_write: bool,

        /// Close shorts before longs in the sequential valuation
        #[arg(long)]
        shorts_first: bool,

        /// Print the records as JSON instead of the console view
        #[arg(long)]
        json: bool,
    },

    /// Show each market's curve and the fee rescale it would get
    Curves,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    match cli.command {
        Commands::Summary {
            vault_balance,
            total_settled_collateral,
            output_dir,
            no_write,
            shorts_first,
            json,
        } => {
            let overrides = Overrides {
                snapshot: cli.snapshot,
                vault_balance,
                total_settled_collateral,
                output_dir,
            };
            let config = RunConfig::resolve(file, overrides, true)?;
            let order = if shorts_first {
                CloseOrder::ShortsFirst
            } else {
                CloseOrder::LongsFirst
            };
            summary::run_summary(&config, order, !no_write, json)?;
        }
        Commands::Curves => {
            let overrides = Overrides {
                snapshot: cli.snapshot,
                ..Default::default()
            };
            let config = RunConfig::resolve(file, overrides, false)?;
            curves::show_curves(&config)?;
        }
    }

    Ok(())
}
