//! Per-market curve inspection

use anyhow::{Context, Result};
use colored::Colorize;

use amm_model::Scale;
use solvency_model::valuation::rebalance_curve;

use crate::config::RunConfig;
use crate::summary::load_snapshot;

/// Show each market's curve and the fee rescale the summary would apply
pub fn show_curves(config: &RunConfig) -> Result<()> {
    let snapshot = load_snapshot(&config.snapshot)?;
    let markets = snapshot.markets()?;

    println!("{}", "=== Market Curves ===".bright_green().bold());

    for market in markets.values() {
        let amm = &market.amm;
        let status = if market.initialized {
            "initialized".bright_green()
        } else {
            "uninitialized".dimmed()
        };
        println!(
            "\n{} {} ({})",
            format!("[{}]", market.market_index).bright_yellow(),
            market.symbol.bold(),
            status
        );

        let mark = amm
            .mark_price()
            .with_context(|| format!("Mark price of {}", market.symbol))?;
        let rows = [
            format!("Mark price:  {}", mark),
            format!("Reserves:    {} / {}", amm.base_asset_reserve, amm.quote_asset_reserve),
            format!("sqrt(k):     {}", amm.sqrt_k),
            format!("Peg:         {}", amm.peg_multiplier),
            format!("Net base:    {}", market.base_asset_amount),
            format!(
                "Fees:        {} total, {} undistributed",
                amm.total_fee, amm.total_fee_minus_distributions
            ),
        ];
        for row in rows {
            println!("  {} {}", "├─".dimmed(), row);
        }

        match rebalance_curve(market) {
            Ok(rebalanced) => {
                let ratio = rebalanced
                    .multiplier
                    .as_ratio(Scale::MARK_PRICE)
                    .with_context(|| format!("k multiplier of {}", market.symbol))?;
                let price = rebalanced
                    .curve
                    .mark_price()
                    .with_context(|| format!("Rescaled mark price of {}", market.symbol))?;
                println!("  {} k multiplier: {}", "├─".dimmed(), ratio);
                println!("  {} Rescaled mark price: {}", "└─".dimmed(), price);
            }
            Err(e) => {
                println!("  {} {}", "└─".dimmed(), format!("Rescale fails: {}", e).bright_red());
            }
        }
    }

    Ok(())
}
