//! Report rendering and the dated JSON report file

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use solvency_model::{AggregateReport, MarketReport, SummaryReport};

/// `dammDesc<Y>-<M>-<D>_<h>-<m>-<s>.json`, fields not zero padded
pub fn report_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!(
        "dammDesc{}-{}-{}_{}-{}-{}.json",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// Write the report records as a JSON array into `dir`
pub fn write_report(report: &SummaryReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(report_file_name(&Local::now()));
    let json = serde_json::to_string_pretty(&report.records())
        .context("Failed to serialize report")?;
    fs::write(&path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;

    log::info!("Report written to {}", path.display());
    Ok(path)
}

fn opt(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{}", value),
        None => "n/a".dimmed().to_string(),
    }
}

pub fn print_market(record: &MarketReport) {
    println!("\n{}", format!("--- {} ---", record.market_symbol).bright_yellow().bold());
    println!(
        "  {} net {} | long {} | short {}",
        "Base:".bright_cyan(),
        record.base_asset_net,
        record.base_asset_long,
        record.base_asset_short
    );
    println!(
        "  {} net {} | long {} | short {}",
        "Quote paid:".bright_cyan(),
        record.quote_paid,
        record.quote_paid_long,
        record.quote_paid_short
    );
    println!(
        "  {} net {} | long {} | short {}",
        "Quote acquired:".bright_cyan(),
        opt(record.quote_acq),
        opt(record.quote_acq_long),
        opt(record.quote_acq_short)
    );
    println!(
        "  {} direct {} | sequential {} | local {}",
        "PnL:".bright_cyan(),
        opt(record.terminal_pnl1),
        opt(record.terminal_pnl2),
        record.local_pnl
    );

    let divergence = match record.pnl_divergence {
        Some(value) if value != 0.0 => value.to_string().bright_red().to_string(),
        other => opt(other),
    };
    println!("  {} {}", "Divergence:".bright_cyan(), divergence);
    println!(
        "  {} exit {} | terminal {} | peg {}",
        "Prices:".bright_cyan(),
        opt(record.exit_price),
        opt(record.terminal_price),
        record.peg
    );
    println!(
        "  {} total {} | undistributed after rescale {}",
        "Fees:".bright_cyan(),
        record.total_fee,
        opt(record.total_fee_minus_distributions)
    );

    if record.terminal_pnl1.is_none() {
        println!("  {}", "Terminal valuation failed; excluded from totals".yellow());
    }
}

pub fn print_aggregate(aggregate: &AggregateReport) {
    println!("\n{}", "=== Solvency ===".bright_green().bold());

    let rows = [
        ("Net quote OI:", aggregate.total_net_quote_oi),
        ("Total quote OI:", aggregate.total_quote_oi),
        ("Vault balance:", aggregate.vaults_balance),
        ("Realised collateral:", aggregate.user_realise_collateral_local),
        ("Withdrawable collateral:", aggregate.user_withdrawable_collateral_local),
        ("Terminal collateral (direct):", aggregate.user_realised_collateral_terminal1),
        ("Terminal collateral (sequential):", aggregate.user_realised_collateral_terminal2),
        ("Local collateral:", aggregate.total_user_collateral_local),
        ("Levered loss:", aggregate.levered_loss),
        ("PnL divergence:", aggregate.total_pnl_divergence),
        ("Settled collateral:", aggregate.total_settled_collateral),
    ];
    for (label, value) in rows {
        println!("  {} {:.3}", label.bright_cyan(), value);
    }

    let shortfalls = [
        ("Realised shortfall:", aggregate.realised_collateral_shortfall),
        ("Withdrawable shortfall:", aggregate.withdrawable_collateral_shortfall),
        ("Settled shortfall:", aggregate.settled_collateral_shortfall),
    ];
    for (label, value) in shortfalls {
        let text = format!("{:.3}", value);
        let text = if value > 0.0 { text.bright_red() } else { text.bright_green() };
        println!("  {} {}", label.bright_cyan(), text);
    }
}
