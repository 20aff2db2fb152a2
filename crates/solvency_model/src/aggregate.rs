//! Position aggregation
//!
//! Walks every account once and folds its positions into per-market tallies
//! (local PnL, long and short cost basis) and the collateral totals. The
//! [`PositionAggregator`] owns its accumulators and hands them back from
//! [`PositionAggregator::finish`].

use std::collections::BTreeMap;

use amm_model::{
    calculate_base_asset_value, calculate_position_pnl, AmmError, MarketPosition, Scale,
    ScaledAmount,
};
use log::debug;

use crate::error::SummaryError;
use crate::snapshot::{AccountSnapshot, Market};

/// Per-market sums over all open positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketTally {
    /// Unrealised PnL including unsettled funding, against the canonical curve
    pub local_pnl: ScaledAmount,
    /// Quote paid to open all long positions
    pub long_cost_basis: ScaledAmount,
    /// Quote received to open all short positions
    pub short_cost_basis: ScaledAmount,
}

impl MarketTally {
    pub fn empty() -> Self {
        Self {
            local_pnl: ScaledAmount::zero(Scale::QUOTE),
            long_cost_basis: ScaledAmount::zero(Scale::QUOTE),
            short_cost_basis: ScaledAmount::zero(Scale::QUOTE),
        }
    }

    fn add_position(&mut self, position: &MarketPosition, pnl: ScaledAmount) -> Result<(), AmmError> {
        self.local_pnl = self.local_pnl.checked_add(pnl)?;
        let quote = position.quote_asset_amount;
        if position.is_long() {
            self.long_cost_basis = self.long_cost_basis.checked_add(quote)?;
        } else {
            self.short_cost_basis = self.short_cost_basis.checked_add(quote)?;
        }
        Ok(())
    }

    /// Cost basis of the net exposure, signed the way a single position
    /// of that size would carry it
    ///
    /// * net long: `long − short`
    /// * net short or flat: `short − long`
    pub fn net_cost_basis(&self, net_base_asset_amount: ScaledAmount) -> Result<ScaledAmount, AmmError> {
        if net_base_asset_amount.is_positive() {
            self.long_cost_basis.checked_sub(self.short_cost_basis)
        } else {
            self.short_cost_basis.checked_sub(self.long_cost_basis)
        }
    }
}

/// Collateral a user could claim, summed over all users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollateralTotals {
    /// Deposited collateral
    pub realized: ScaledAmount,
    /// `min(collateral, free collateral)` per user
    pub withdrawable: ScaledAmount,
}

impl CollateralTotals {
    pub fn empty() -> Self {
        Self {
            realized: ScaledAmount::zero(Scale::QUOTE),
            withdrawable: ScaledAmount::zero(Scale::QUOTE),
        }
    }
}

/// Margin view of a single account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMargin {
    pub collateral: ScaledAmount,
    pub unrealized_pnl: ScaledAmount,
    pub margin_requirement: ScaledAmount,
    /// `max(0, collateral + pnl − margin requirement)`
    pub free_collateral: ScaledAmount,
    /// `min(collateral, free collateral)`
    pub withdrawable_collateral: ScaledAmount,
}

/// Result of a full aggregation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub tallies: BTreeMap<u64, MarketTally>,
    pub collateral: CollateralTotals,
    pub accounts: usize,
}

impl Aggregation {
    /// Tally of a market, empty if no open position touches it
    pub fn tally(&self, market_index: u64) -> MarketTally {
        self.tallies
            .get(&market_index)
            .copied()
            .unwrap_or_else(MarketTally::empty)
    }
}

pub struct PositionAggregator<'a> {
    markets: &'a BTreeMap<u64, Market>,
    tallies: BTreeMap<u64, MarketTally>,
    collateral: CollateralTotals,
    accounts: usize,
}

impl<'a> PositionAggregator<'a> {
    pub fn new(markets: &'a BTreeMap<u64, Market>) -> Self {
        Self {
            markets,
            tallies: BTreeMap::new(),
            collateral: CollateralTotals::empty(),
            accounts: 0,
        }
    }

    /// Fold one account into the running totals
    ///
    /// Closed positions (zero base) are skipped. The account's tallies are
    /// only committed once every position has been valued.
    pub fn add_account(&mut self, account: &AccountSnapshot) -> Result<AccountMargin, SummaryError> {
        let context = |what: &str| format!("{} for user {}", what, account.user);

        let mut unrealized_pnl = ScaledAmount::zero(Scale::QUOTE);
        let mut margin_requirement = ScaledAmount::zero(Scale::QUOTE);
        let mut updates: Vec<(u64, &MarketPosition, ScaledAmount)> = Vec::new();

        for position in account.positions.iter().filter(|p| p.is_open()) {
            let market = self.markets.get(&position.market_index).ok_or(
                SummaryError::UnknownMarket {
                    market_index: position.market_index,
                },
            )?;

            let pnl = calculate_position_pnl(&market.amm, position, true)
                .map_err(|e| SummaryError::arithmetic(context("position pnl"), e))?;
            let margin = calculate_base_asset_value(&market.amm, position)
                .and_then(|value| value.mul(market.margin_ratio_initial, Scale::QUOTE))
                .map_err(|e| SummaryError::arithmetic(context("margin requirement"), e))?;

            unrealized_pnl = unrealized_pnl
                .checked_add(pnl)
                .map_err(|e| SummaryError::arithmetic(context("unrealized pnl"), e))?;
            margin_requirement = margin_requirement
                .checked_add(margin)
                .map_err(|e| SummaryError::arithmetic(context("margin requirement"), e))?;
            updates.push((position.market_index, position, pnl));
        }

        let margin = account_margin(account.collateral, unrealized_pnl, margin_requirement)
            .map_err(|e| SummaryError::arithmetic(context("free collateral"), e))?;

        for (market_index, position, pnl) in updates {
            self.tallies
                .entry(market_index)
                .or_insert_with(MarketTally::empty)
                .add_position(position, pnl)
                .map_err(|e| SummaryError::arithmetic(format!("tally of market {}", market_index), e))?;
        }

        self.collateral.realized = self
            .collateral
            .realized
            .checked_add(margin.collateral)
            .map_err(|e| SummaryError::arithmetic("realized collateral total", e))?;
        self.collateral.withdrawable = self
            .collateral
            .withdrawable
            .checked_add(margin.withdrawable_collateral)
            .map_err(|e| SummaryError::arithmetic("withdrawable collateral total", e))?;
        self.accounts += 1;

        debug!(
            "account {}: collateral={} pnl={} margin={} withdrawable={}",
            account.user,
            margin.collateral,
            margin.unrealized_pnl,
            margin.margin_requirement,
            margin.withdrawable_collateral
        );

        Ok(margin)
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            tallies: self.tallies,
            collateral: self.collateral,
            accounts: self.accounts,
        }
    }
}

fn account_margin(
    collateral: ScaledAmount,
    unrealized_pnl: ScaledAmount,
    margin_requirement: ScaledAmount,
) -> Result<AccountMargin, AmmError> {
    let free_collateral = collateral
        .checked_add(unrealized_pnl)?
        .checked_sub(margin_requirement)?
        .max(ScaledAmount::zero(Scale::QUOTE))?;
    let withdrawable_collateral = collateral.min(free_collateral)?;

    Ok(AccountMargin {
        collateral,
        unrealized_pnl,
        margin_requirement,
        free_collateral,
        withdrawable_collateral,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amm_model::Curve;

    fn market(index: u64, units: i64) -> Market {
        Market {
            market_index: index,
            symbol: format!("M{}", index),
            initialized: true,
            base_asset_amount: ScaledAmount::zero(Scale::RESERVE),
            base_asset_amount_long: ScaledAmount::zero(Scale::RESERVE),
            base_asset_amount_short: ScaledAmount::zero(Scale::RESERVE),
            margin_ratio_initial: ScaledAmount::new(2_000, Scale::MARGIN),
            amm: Curve::new(
                ScaledAmount::from_units(units, Scale::RESERVE),
                ScaledAmount::from_units(units, Scale::RESERVE),
                ScaledAmount::from_units(1, Scale::PEG),
            )
            .unwrap(),
        }
    }

    fn markets() -> BTreeMap<u64, Market> {
        let mut markets = BTreeMap::new();
        markets.insert(0, market(0, 100_000));
        markets
    }

    fn position(market_index: u64, base_units: i64, quote_units: i64) -> MarketPosition {
        MarketPosition::new(
            market_index,
            ScaledAmount::from_units(base_units, Scale::RESERVE),
            ScaledAmount::from_units(quote_units, Scale::QUOTE),
            ScaledAmount::zero(Scale::FUNDING_RATE),
        )
    }

    fn account(user: &str, collateral_units: i64, positions: Vec<MarketPosition>) -> AccountSnapshot {
        AccountSnapshot {
            user: user.to_string(),
            collateral: ScaledAmount::from_units(collateral_units, Scale::QUOTE),
            positions,
        }
    }

    fn quote(units: i64) -> ScaledAmount {
        ScaledAmount::from_units(units, Scale::QUOTE)
    }

    #[test]
    fn test_net_cost_basis_sign_convention() {
        let tally = MarketTally {
            local_pnl: quote(0),
            long_cost_basis: quote(1_000),
            short_cost_basis: quote(400),
        };

        let net_long = tally
            .net_cost_basis(ScaledAmount::from_units(3, Scale::RESERVE))
            .unwrap();
        assert_eq!(net_long, quote(600));

        let net_short = tally
            .net_cost_basis(ScaledAmount::from_units(-3, Scale::RESERVE))
            .unwrap();
        assert_eq!(net_short, quote(-600));

        let flat = tally.net_cost_basis(ScaledAmount::zero(Scale::RESERVE)).unwrap();
        assert_eq!(flat, quote(-600));
    }

    #[test]
    fn test_closed_positions_are_skipped() {
        let markets = markets();
        let mut aggregator = PositionAggregator::new(&markets);
        aggregator
            .add_account(&account("flat", 50, vec![position(0, 0, 999)]))
            .unwrap();

        let aggregation = aggregator.finish();
        assert!(aggregation.tallies.is_empty());
        assert_eq!(aggregation.tally(0), MarketTally::empty());
        assert_eq!(aggregation.collateral.realized, quote(50));
        assert_eq!(aggregation.collateral.withdrawable, quote(50));
    }

    #[test]
    fn test_tallies_split_by_side() {
        let markets = markets();
        let mut aggregator = PositionAggregator::new(&markets);
        aggregator
            .add_account(&account("a", 1_000, vec![position(0, 5, 500)]))
            .unwrap();
        aggregator
            .add_account(&account("b", 1_000, vec![position(0, -2, 200)]))
            .unwrap();

        let tally = aggregator.finish().tally(0);
        assert_eq!(tally.long_cost_basis, quote(500));
        assert_eq!(tally.short_cost_basis, quote(200));
        // long: 4.999750 - 500, short: 200 - 2.000040
        assert_eq!(
            tally.local_pnl,
            ScaledAmount::new(4_999_750 - 500_000_000 + 200_000_000 - 2_000_040, Scale::QUOTE)
        );
    }

    #[test]
    fn test_free_collateral_floors_at_zero() {
        let markets = markets();
        let mut aggregator = PositionAggregator::new(&markets);

        // bought 5 base for 500 with only 100 collateral: deep underwater
        let margin = aggregator
            .add_account(&account("under", 100, vec![position(0, 5, 500)]))
            .unwrap();
        assert!(margin.free_collateral.is_zero());
        assert!(margin.withdrawable_collateral.is_zero());

        let totals = aggregator.finish().collateral;
        assert_eq!(totals.realized, quote(100));
        assert!(totals.withdrawable.is_zero());
    }

    #[test]
    fn test_withdrawable_capped_by_collateral() {
        let markets = markets();
        let mut aggregator = PositionAggregator::new(&markets);

        // short 5 opened at 500 quote, now worth 5.000250: large gain
        let margin = aggregator
            .add_account(&account("winner", 10, vec![position(0, -5, 500)]))
            .unwrap();
        // 10 + 494.99975 - 1.00005
        assert_eq!(margin.free_collateral, ScaledAmount::new(503_999_700, Scale::QUOTE));
        assert_eq!(margin.withdrawable_collateral, quote(10));
    }

    #[test]
    fn test_unknown_market_is_fatal() {
        let markets = markets();
        let mut aggregator = PositionAggregator::new(&markets);

        let result = aggregator.add_account(&account("a", 10, vec![position(7, 1, 1)]));
        assert_eq!(result, Err(SummaryError::UnknownMarket { market_index: 7 }));
    }
}
