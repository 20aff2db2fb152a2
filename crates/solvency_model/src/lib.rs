//! Solvency Model - Exposure and settlement analytics over a market snapshot
//!
//! Given every market's curve and every user's collateral and positions,
//! [`summarize`] produces one record per market plus a solvency roll-up:
//!
//! 1. [`aggregate`] sums positions bottom-up against each market's live curve
//! 2. [`valuation`] folds undistributed fees into each curve and values the
//!    aggregate exposure as if it were closed at once
//! 3. [`report`] converts to decimals and compares user claims against the
//!    externally known vault balances
//!
//! Curve math lives in `amm_model`; this crate only orchestrates it.

pub mod aggregate;
pub mod error;
pub mod report;
pub mod snapshot;
pub mod valuation;

pub use aggregate::{AccountMargin, Aggregation, CollateralTotals, MarketTally, PositionAggregator};
pub use error::SummaryError;
pub use report::{
    round_decimal, AggregateReport, ExternalBalances, MarketReport, ReportAssembler, ReportRecord,
    SummaryReport,
};
pub use snapshot::{AccountSnapshot, Market, Snapshot};
pub use valuation::{value_market, CloseOrder, MarketValuation, SyntheticPositions};

use log::{debug, info, warn};

/// Run a full summary over `snapshot`
///
/// Missing accounts, unknown markets and arithmetic faults while
/// aggregating positions abort the run. A fault while valuing a single
/// market only nulls that market's valuation fields.
pub fn summarize(
    snapshot: &Snapshot,
    balances: &ExternalBalances,
    order: CloseOrder,
) -> Result<SummaryReport, SummaryError> {
    let markets = snapshot.markets()?;
    let accounts = snapshot.accounts()?;

    let mut aggregator = PositionAggregator::new(&markets);
    for account in &accounts {
        aggregator.add_account(account)?;
    }
    let aggregation = aggregator.finish();
    info!(
        "Aggregated {} accounts over {} markets",
        aggregation.accounts,
        markets.len()
    );

    let mut assembler = ReportAssembler::new();
    for market in markets.values() {
        if !market.initialized {
            debug!("Skipping uninitialized market {}", market.market_index);
            continue;
        }

        let tally = aggregation.tally(market.market_index);
        let valuation = match value_market(market, &tally, order) {
            Ok(valuation) => Some(valuation),
            Err(e) => {
                warn!(
                    "Terminal valuation of {} (market {}) failed: {}",
                    market.symbol, market.market_index, e
                );
                None
            }
        };

        if let Some(valuation) = &valuation {
            debug!(
                "{}: k multiplier {}, fees returned {}",
                market.symbol,
                valuation
                    .rebalanced
                    .multiplier
                    .as_ratio(amm_model::Scale::MARK_PRICE)
                    .map(|ratio| ratio.to_string())
                    .unwrap_or_else(|e| e.to_string()),
                valuation.rebalanced.cost
            );
        }

        assembler
            .add_market(market, &tally, valuation.as_ref())
            .map_err(|e| {
                SummaryError::arithmetic(format!("report for market {}", market.market_index), e)
            })?;
    }

    let report = assembler.finish(&aggregation.collateral, balances);
    info!(
        "Summary: {} markets, terminal collateral {:.3}, vault {:.3}",
        report.markets.len(),
        report.aggregate.user_realised_collateral_terminal1,
        report.aggregate.vaults_balance
    );
    Ok(report)
}
