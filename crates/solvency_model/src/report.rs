//! Report records
//!
//! Fixed-point amounts are converted to decimals here and nowhere else.
//! Field order of the records is the order consumers see in the output.

use amm_model::{AmmError, ScaledAmount};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::aggregate::{CollateralTotals, MarketTally};
use crate::snapshot::Market;
use crate::valuation::MarketValuation;

/// Round to 3 decimals, halves toward positive infinity
pub fn round_decimal(value: f64) -> f64 {
    (value * 1000.0 + 0.5).floor() / 1000.0
}

fn rounded(amount: ScaledAmount) -> f64 {
    round_decimal(amount.to_decimal())
}

/// `|cost / base|` rounded, `None` when it is not a finite number
fn entry_price(cost_basis: f64, base: f64) -> Option<f64> {
    let price = (cost_basis / base).abs();
    price.is_finite().then(|| round_decimal(price))
}

/// Externally supplied balances
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalBalances {
    /// Collateral actually held in the vault
    pub vault_balance: f64,
    /// Collateral already settled out of the system
    pub total_settled_collateral: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub market_symbol: String,
    pub quote_acq: Option<f64>,
    pub quote_acq_long: Option<f64>,
    pub quote_acq_short: Option<f64>,
    pub quote_paid: f64,
    pub quote_paid_long: f64,
    pub quote_paid_short: f64,
    pub terminal_pnl1: Option<f64>,
    pub terminal_pnl2: Option<f64>,
    pub local_pnl: f64,
    pub pnl_divergence: Option<f64>,
    pub exit_price: Option<f64>,
    pub terminal_price: Option<f64>,
    pub peg: f64,
    #[serde(rename = "total_fee")]
    pub total_fee: f64,
    #[serde(rename = "total_fee_minus_distributions")]
    pub total_fee_minus_distributions: Option<f64>,
    pub base_asset_net: f64,
    pub base_asset_long: f64,
    pub base_asset_short: f64,
    pub entry_price_net: Option<f64>,
    pub entry_price_long: Option<f64>,
    pub entry_price_short: Option<f64>,
}

/// Solvency roll-up over all markets (not rounded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub market_symbol: String,
    #[serde(rename = "totalNetQuoteOI")]
    pub total_net_quote_oi: f64,
    #[serde(rename = "totalLongQuoteOI")]
    pub total_long_quote_oi: f64,
    #[serde(rename = "totalShortQuoteOI")]
    pub total_short_quote_oi: f64,
    #[serde(rename = "totalQuoteOI")]
    pub total_quote_oi: f64,
    pub vaults_balance: f64,
    pub user_realise_collateral_local: f64,
    pub user_withdrawable_collateral_local: f64,
    pub user_realised_collateral_terminal1: f64,
    pub terminal_user_pnl1: f64,
    /// Includes markets whose terminal valuation faulted
    pub local_user_unrealised_pnl: f64,
    pub user_realised_collateral_terminal2: f64,
    pub total_user_collateral_local: f64,
    pub levered_loss: f64,
    pub realised_collateral_shortfall: f64,
    pub withdrawable_collateral_shortfall: f64,
    pub total_pnl_divergence: f64,
    pub settled_collateral_shortfall: f64,
    pub total_settled_collateral: f64,
}

/// One output record; the aggregate record closes the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportRecord {
    Market(MarketReport),
    Aggregate(AggregateReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub markets: Vec<MarketReport>,
    pub aggregate: AggregateReport,
}

impl SummaryReport {
    pub fn records(&self) -> Vec<ReportRecord> {
        self.markets
            .iter()
            .cloned()
            .map(ReportRecord::Market)
            .chain(std::iter::once(ReportRecord::Aggregate(self.aggregate.clone())))
            .collect()
    }
}

/// Running sums over the market records
#[derive(Debug, Default)]
pub struct ReportAssembler {
    markets: Vec<MarketReport>,
    quote_acq: f64,
    quote_acq_long: f64,
    quote_acq_short: f64,
    terminal_pnl_direct: f64,
    terminal_pnl_sequential: f64,
    local_pnl: f64,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a market record
    ///
    /// A `None` valuation marks a market whose terminal valuation faulted:
    /// its valuation fields are null and it is left out of the OI and
    /// terminal sums. Its local PnL is still counted.
    pub fn add_market(
        &mut self,
        market: &Market,
        tally: &MarketTally,
        valuation: Option<&MarketValuation>,
    ) -> Result<(), AmmError> {
        let net_cost_basis = tally.net_cost_basis(market.base_asset_amount)?.to_decimal();
        let long_cost_basis = tally.long_cost_basis.to_decimal();
        let short_cost_basis = tally.short_cost_basis.abs().to_decimal();
        let local_pnl = tally.local_pnl.to_decimal();

        let base_asset_net = market.base_asset_amount.to_decimal();
        let base_asset_long = market.base_asset_amount_long.to_decimal();
        let base_asset_short = market.base_asset_amount_short.to_decimal();

        let quote_acq = valuation.map(|v| {
            (
                rounded(v.quote_acquired.net),
                rounded(v.quote_acquired.long),
                rounded(v.quote_acquired.short),
            )
        });
        let terminal_pnl_direct = valuation.map(|v| v.terminal_pnl_direct.to_decimal());
        let terminal_pnl_sequential = valuation.map(|v| v.terminal_pnl_sequential.to_decimal());

        if let Some((net, long, short)) = quote_acq {
            self.quote_acq += net;
            self.quote_acq_long += long;
            self.quote_acq_short += short;
            self.terminal_pnl_direct += terminal_pnl_direct.unwrap_or_default();
            self.terminal_pnl_sequential += terminal_pnl_sequential.unwrap_or_default();
        }
        self.local_pnl += local_pnl;

        let record = MarketReport {
            market_symbol: market.symbol.clone(),
            quote_acq: quote_acq.map(|(net, _, _)| net),
            quote_acq_long: quote_acq.map(|(_, long, _)| long),
            quote_acq_short: quote_acq.map(|(_, _, short)| short),
            quote_paid: round_decimal(net_cost_basis),
            quote_paid_long: round_decimal(long_cost_basis),
            quote_paid_short: round_decimal(short_cost_basis),
            terminal_pnl1: terminal_pnl_direct.map(round_decimal),
            terminal_pnl2: terminal_pnl_sequential.map(round_decimal),
            local_pnl: round_decimal(local_pnl),
            pnl_divergence: terminal_pnl_direct.map(|direct| round_decimal(local_pnl - direct)),
            exit_price: valuation.and_then(|v| v.exit_price).map(ScaledAmount::to_decimal),
            terminal_price: valuation.map(|v| rounded(v.terminal_price)),
            peg: rounded(market.amm.peg_multiplier),
            total_fee: rounded(market.amm.total_fee),
            total_fee_minus_distributions: valuation
                .map(|v| rounded(v.rebalanced.curve.total_fee_minus_distributions)),
            base_asset_net,
            base_asset_long,
            base_asset_short,
            entry_price_net: entry_price(net_cost_basis, base_asset_net),
            entry_price_long: entry_price(long_cost_basis, base_asset_long),
            entry_price_short: entry_price(short_cost_basis, base_asset_short),
        };
        debug!(
            "{}: terminal pnl {:?} / {:?}, local pnl {}",
            record.market_symbol, record.terminal_pnl1, record.terminal_pnl2, record.local_pnl
        );
        self.markets.push(record);
        Ok(())
    }

    /// Close the list with the aggregate record
    pub fn finish(self, collateral: &CollateralTotals, balances: &ExternalBalances) -> SummaryReport {
        let realized = collateral.realized.to_decimal();
        let withdrawable = collateral.withdrawable.to_decimal();

        let terminal1 = realized + self.terminal_pnl_direct;
        let terminal2 = realized + self.terminal_pnl_sequential;
        let total_local = realized + self.local_pnl;

        let aggregate = AggregateReport {
            market_symbol: "ALL".to_string(),
            total_net_quote_oi: self.quote_acq,
            total_long_quote_oi: self.quote_acq_long,
            total_short_quote_oi: self.quote_acq_short,
            total_quote_oi: self.quote_acq_long + self.quote_acq_short,
            vaults_balance: balances.vault_balance,
            user_realise_collateral_local: realized,
            user_withdrawable_collateral_local: withdrawable,
            user_realised_collateral_terminal1: terminal1,
            terminal_user_pnl1: self.terminal_pnl_direct,
            local_user_unrealised_pnl: self.local_pnl,
            user_realised_collateral_terminal2: terminal2,
            total_user_collateral_local: total_local,
            levered_loss: balances.vault_balance - terminal1,
            realised_collateral_shortfall: realized - balances.vault_balance,
            withdrawable_collateral_shortfall: withdrawable - balances.vault_balance,
            total_pnl_divergence: total_local - terminal1,
            settled_collateral_shortfall: balances.total_settled_collateral - balances.vault_balance,
            total_settled_collateral: balances.total_settled_collateral,
        };

        SummaryReport {
            markets: self.markets,
            aggregate,
        }
    }
}
