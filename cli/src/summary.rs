//! Exposure and solvency summary

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use solvency_model::{summarize, CloseOrder, Snapshot};

use crate::config::RunConfig;
use crate::output;

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

    log::info!(
        "Loaded snapshot {}: {} markets, {} users, {} position books",
        path.display(),
        snapshot.markets.len(),
        snapshot.users.len(),
        snapshot.user_positions.len()
    );
    Ok(snapshot)
}

pub fn run_summary(config: &RunConfig, order: CloseOrder, write: bool, json: bool) -> Result<()> {
    let snapshot = load_snapshot(&config.snapshot)?;
    let report = summarize(&snapshot, &config.balances, order)
        .with_context(|| format!("Summary of {} failed", config.snapshot.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.records())?);
    } else {
        println!("{}", "=== Market Summary ===".bright_green().bold());
        println!("{} {}", "Snapshot:".bright_cyan(), config.snapshot.display());
        println!("{} {:?}", "Close order:".bright_cyan(), order);
        for record in &report.markets {
            output::print_market(record);
        }
        output::print_aggregate(&report.aggregate);
    }

    if write {
        let path = output::write_report(&report, &config.output_dir)?;
        if !json {
            println!("\n{} {}", "Report:".bright_cyan(), path.display());
        }
    }

    Ok(())
}
