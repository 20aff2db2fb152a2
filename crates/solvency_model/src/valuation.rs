//! Terminal valuation of a market
//!
//! A market's open interest is collapsed into synthetic positions (net,
//! long-only, short-only), the curve is rescaled so that undistributed fees
//! are handed back to the net exposure, and the synthetic positions are then
//! closed against the rescaled curve two ways:
//!
//! * direct: the net position closes in one swap
//! * sequential: one side closes first and the other closes against the
//!   curve that side left behind
//!
//! Every simulated swap runs on a [`Curve::fork`]; the market's canonical
//! curve is never touched.

use amm_model::{
    calculate_base_asset_value, calculate_budgeted_k, calculate_position_pnl, AmmError, Curve,
    KMultiplier, MarketPosition, Scale, ScaledAmount,
};

use crate::aggregate::MarketTally;
use crate::snapshot::Market;

/// Which side closes first in the sequential valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseOrder {
    #[default]
    LongsFirst,
    ShortsFirst,
}

/// Aggregate positions standing in for every user in a market
///
/// All three share the market's cumulative funding rate as their checkpoint,
/// so no funding accrues on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticPositions {
    pub net: MarketPosition,
    pub long: MarketPosition,
    pub short: MarketPosition,
}

impl SyntheticPositions {
    pub fn new(market: &Market, tally: &MarketTally) -> Result<Self, AmmError> {
        let funding = market.amm.cumulative_funding_rate;
        let position = |base, quote| MarketPosition::new(market.market_index, base, quote, funding);

        Ok(Self {
            net: position(
                market.base_asset_amount,
                tally.net_cost_basis(market.base_asset_amount)?,
            ),
            long: position(market.base_asset_amount_long, tally.long_cost_basis),
            short: position(market.base_asset_amount_short, tally.short_cost_basis.abs()),
        })
    }
}

/// A market curve after undistributed fees were folded into k
#[derive(Debug, PartialEq, Eq)]
pub struct RebalancedCurve {
    pub curve: Curve,
    pub multiplier: KMultiplier,
    /// Fees handed back to the net exposure
    pub cost: ScaledAmount,
}

/// Rescale a fork of the market's curve so the net exposure gains the
/// market's undistributed fees
///
/// The fee pool is consumed even when the net exposure is flat and the
/// multiplier degenerates to identity.
pub fn rebalance_curve(market: &Market) -> Result<RebalancedCurve, AmmError> {
    let mut curve = market.amm.fork();
    let cost = curve.total_fee_minus_distributions;
    let multiplier = calculate_budgeted_k(&curve, market.base_asset_amount, cost)?;

    curve.total_fee_minus_distributions = curve.total_fee_minus_distributions.checked_sub(cost)?;
    curve.apply_k_multiplier(&multiplier)?;

    Ok(RebalancedCurve {
        curve,
        multiplier,
        cost,
    })
}

/// Quote each synthetic position would realise on the rebalanced curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteAcquired {
    pub net: ScaledAmount,
    pub long: ScaledAmount,
    pub short: ScaledAmount,
}

impl QuoteAcquired {
    pub fn new(curve: &Curve, synthetic: &SyntheticPositions) -> Result<Self, AmmError> {
        Ok(Self {
            net: calculate_base_asset_value(curve, &synthetic.net)?,
            long: calculate_base_asset_value(curve, &synthetic.long)?,
            short: calculate_base_asset_value(curve, &synthetic.short)?,
        })
    }
}

/// PnL of closing the net position against `curve` in one swap
pub fn value_direct(curve: &Curve, synthetic: &SyntheticPositions) -> Result<ScaledAmount, AmmError> {
    calculate_position_pnl(curve, &synthetic.net, false)
}

/// PnL of closing one side, then the other against the reserves it left
pub fn value_sequential(
    curve: &Curve,
    synthetic: &SyntheticPositions,
    order: CloseOrder,
) -> Result<ScaledAmount, AmmError> {
    let (first, second) = match order {
        CloseOrder::LongsFirst => (&synthetic.long, &synthetic.short),
        CloseOrder::ShortsFirst => (&synthetic.short, &synthetic.long),
    };

    let mut first_curve = curve.fork();
    let first_pnl = calculate_position_pnl(&first_curve, first, false)?;
    first_curve.close(first.base_asset_amount)?;

    let mut second_curve = curve.fork();
    second_curve.set_reserves(first_curve.reserves());
    let second_pnl = calculate_position_pnl(&second_curve, second, false)?;

    first_pnl.checked_add(second_pnl)
}

/// Average price the net exposure would exit at (quote precision)
///
/// `None` when the market is flat.
pub fn exit_price(
    quote_acquired: ScaledAmount,
    net_base_asset_amount: ScaledAmount,
) -> Result<Option<ScaledAmount>, AmmError> {
    if net_base_asset_amount.is_zero() {
        return Ok(None);
    }
    quote_acquired
        .div(net_base_asset_amount.abs(), Scale::QUOTE)
        .map(Some)
}

/// Mark price after the net exposure has been closed
pub fn terminal_price(curve: &Curve, net_base_asset_amount: ScaledAmount) -> Result<ScaledAmount, AmmError> {
    curve.price_at(curve.reserves_after_close(net_base_asset_amount)?)
}

/// Everything the report needs about one market's terminal state
#[derive(Debug, PartialEq, Eq)]
pub struct MarketValuation {
    pub rebalanced: RebalancedCurve,
    pub synthetic: SyntheticPositions,
    pub quote_acquired: QuoteAcquired,
    /// Net position closed in one swap
    pub terminal_pnl_direct: ScaledAmount,
    /// Sides closed one after the other
    pub terminal_pnl_sequential: ScaledAmount,
    pub exit_price: Option<ScaledAmount>,
    pub terminal_price: ScaledAmount,
}

pub fn value_market(
    market: &Market,
    tally: &MarketTally,
    order: CloseOrder,
) -> Result<MarketValuation, AmmError> {
    let synthetic = SyntheticPositions::new(market, tally)?;
    let rebalanced = rebalance_curve(market)?;
    let curve = &rebalanced.curve;

    let quote_acquired = QuoteAcquired::new(curve, &synthetic)?;
    let terminal_pnl_direct = value_direct(curve, &synthetic)?;
    let terminal_pnl_sequential = value_sequential(curve, &synthetic, order)?;
    let exit_price = exit_price(quote_acquired.net, market.base_asset_amount)?;
    let terminal_price = terminal_price(curve, market.base_asset_amount)?;

    Ok(MarketValuation {
        rebalanced,
        synthetic,
        quote_acquired,
        terminal_pnl_direct,
        terminal_pnl_sequential,
        exit_price,
        terminal_price,
    })
}
