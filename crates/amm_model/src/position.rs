//! Position valuation against a curve
//!
//! All functions here are read-only on the curve: the closing swap is only
//! simulated to find out how much quote the position would realise.

use crate::curve::Curve;
use crate::math::PositionDirection;
use crate::precision::{Scale, ScaledAmount};
use crate::AmmError;

/// A trader's (or a synthetic aggregate) exposure in one market
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketPosition {
    pub market_index: u64,
    /// Signed base amount, positive = long (reserve precision)
    pub base_asset_amount: ScaledAmount,
    /// Quote paid or received to open (quote precision)
    pub quote_asset_amount: ScaledAmount,
    /// Funding checkpoint (funding precision)
    pub last_cumulative_funding_rate: ScaledAmount,
    pub open_orders: u128,
}

impl MarketPosition {
    pub fn new(
        market_index: u64,
        base_asset_amount: ScaledAmount,
        quote_asset_amount: ScaledAmount,
        last_cumulative_funding_rate: ScaledAmount,
    ) -> Self {
        Self {
            market_index,
            base_asset_amount,
            quote_asset_amount,
            last_cumulative_funding_rate,
            open_orders: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.base_asset_amount.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.base_asset_amount.is_positive()
    }
}

/// Quote the position would realise by closing in one swap
///
/// Always non-negative: for a long this is the quote received, for a short
/// the quote paid to buy back. Zero for a closed position.
pub fn calculate_base_asset_value(
    curve: &Curve,
    position: &MarketPosition,
) -> Result<ScaledAmount, AmmError> {
    if !position.is_open() {
        return Ok(ScaledAmount::zero(Scale::QUOTE));
    }

    let direction = PositionDirection::to_close(position.base_asset_amount.raw());
    let after = curve.reserves_after_close(position.base_asset_amount)?;

    let quote_moved = match direction {
        PositionDirection::Short => curve.quote_asset_reserve.checked_sub(after.quote)?,
        PositionDirection::Long => after.quote.checked_sub(curve.quote_asset_reserve)?,
    };

    quote_moved.mul(curve.peg_multiplier, Scale::QUOTE)
}

/// Funding owed to (positive) or by (negative) the position since its checkpoint
pub fn calculate_funding_pnl(
    curve: &Curve,
    position: &MarketPosition,
) -> Result<ScaledAmount, AmmError> {
    if !position.is_open() {
        return Ok(ScaledAmount::zero(Scale::QUOTE));
    }

    let rate_delta = curve
        .cumulative_funding_rate
        .checked_sub(position.last_cumulative_funding_rate)?;
    let payment = rate_delta.mul(position.base_asset_amount, Scale::QUOTE)?;
    Ok(payment.neg())
}

/// Unrealised PnL of closing the position against `curve`
///
/// - long: value − cost basis
/// - short: cost basis − value
///
/// With `with_funding`, unsettled funding since the position's checkpoint is
/// added on top.
pub fn calculate_position_pnl(
    curve: &Curve,
    position: &MarketPosition,
    with_funding: bool,
) -> Result<ScaledAmount, AmmError> {
    if !position.is_open() {
        return Ok(ScaledAmount::zero(Scale::QUOTE));
    }

    let value = calculate_base_asset_value(curve, position)?;
    let pnl = if position.is_long() {
        value.checked_sub(position.quote_asset_amount)?
    } else {
        position.quote_asset_amount.checked_sub(value)?
    };

    if with_funding {
        pnl.checked_add(calculate_funding_pnl(curve, position)?)
    } else {
        Ok(pnl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(units: i64) -> Curve {
        Curve::new(
            ScaledAmount::from_units(units, Scale::RESERVE),
            ScaledAmount::from_units(units, Scale::RESERVE),
            ScaledAmount::from_units(1, Scale::PEG),
        )
        .unwrap()
    }

    fn position(base_units: i64, quote_units: i64) -> MarketPosition {
        MarketPosition::new(
            0,
            ScaledAmount::from_units(base_units, Scale::RESERVE),
            ScaledAmount::from_units(quote_units, Scale::QUOTE),
            ScaledAmount::zero(Scale::FUNDING_RATE),
        )
    }

    #[test]
    fn test_long_value_includes_slippage() {
        // 100,000 x 100,000 curve, sell 5 base: 100000 * 5 / 100005 = 4.999750...
        let value = calculate_base_asset_value(&curve(100_000), &position(5, 500)).unwrap();
        assert_eq!(value, ScaledAmount::new(4_999_750, Scale::QUOTE));
    }

    #[test]
    fn test_short_value_includes_slippage() {
        // buy back 5 base: 100000 * 5 / 99995 = 5.000250...
        let value = calculate_base_asset_value(&curve(100_000), &position(-5, 500)).unwrap();
        assert_eq!(value, ScaledAmount::new(5_000_250, Scale::QUOTE));
    }

    #[test]
    fn test_pnl_sign_by_side() {
        let market = curve(100_000);

        let long = calculate_position_pnl(&market, &position(5, 500), false).unwrap();
        assert_eq!(long, ScaledAmount::new(4_999_750 - 500_000_000, Scale::QUOTE));

        let short = calculate_position_pnl(&market, &position(-5, 500), false).unwrap();
        assert_eq!(short, ScaledAmount::new(500_000_000 - 5_000_250, Scale::QUOTE));
    }

    #[test]
    fn test_closed_position_is_worth_nothing() {
        let market = curve(100_000);
        let flat = position(0, 123);
        assert!(calculate_base_asset_value(&market, &flat).unwrap().is_zero());
        assert!(calculate_position_pnl(&market, &flat, true).unwrap().is_zero());
    }

    #[test]
    fn test_funding_paid_by_longs_when_rate_rises() {
        let mut market = curve(100_000);
        // rate moved by 0.01 quote per base since the checkpoint
        market.cumulative_funding_rate = ScaledAmount::new(1_000_000_000_000, Scale::FUNDING_RATE);

        let long = position(5, 500);
        let funding = calculate_funding_pnl(&market, &long).unwrap();
        assert_eq!(funding, ScaledAmount::new(-50_000, Scale::QUOTE));

        let without = calculate_position_pnl(&market, &long, false).unwrap();
        let with = calculate_position_pnl(&market, &long, true).unwrap();
        assert_eq!(with.raw(), without.raw() - 50_000);

        let short = position(-5, 500);
        assert_eq!(
            calculate_funding_pnl(&market, &short).unwrap(),
            ScaledAmount::new(50_000, Scale::QUOTE)
        );
    }
}
