//! Per-market curve state
//!
//! A [`Curve`] is the liquidity snapshot of one market. The canonical copy
//! read from the snapshot is never swapped against; callers that need a
//! what-if state take a [`Curve::fork`] first.

use crate::math::{swap_output, PositionDirection, SwapDirection};
use crate::precision::{Scale, ScaledAmount};
use crate::wide::Wide;
use crate::AmmError;

/// Base and quote reserves of a curve state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    pub base: ScaledAmount,
    pub quote: ScaledAmount,
}

/// Constant product curve of a single market
#[derive(Debug, PartialEq, Eq)]
pub struct Curve {
    /// Base asset reserve (reserve precision)
    pub base_asset_reserve: ScaledAmount,
    /// Quote asset reserve (reserve precision)
    pub quote_asset_reserve: ScaledAmount,
    /// Square root of the invariant (reserve precision)
    pub sqrt_k: ScaledAmount,
    /// Peg multiplier (peg precision)
    pub peg_multiplier: ScaledAmount,
    /// Cumulative funding rate (funding precision)
    pub cumulative_funding_rate: ScaledAmount,
    /// Lifetime fees collected (quote precision)
    pub total_fee: ScaledAmount,
    /// Fees not yet handed back to traders (quote precision)
    pub total_fee_minus_distributions: ScaledAmount,
}

impl Curve {
    /// Curve with the given reserves and peg, no funding and no fees
    ///
    /// `sqrt_k` is derived as the integer square root of `base × quote`.
    pub fn new(
        base_asset_reserve: ScaledAmount,
        quote_asset_reserve: ScaledAmount,
        peg_multiplier: ScaledAmount,
    ) -> Result<Self, AmmError> {
        if !base_asset_reserve.is_positive() || !quote_asset_reserve.is_positive() {
            return Err(AmmError::InvalidReserves);
        }
        let k = Wide::from_i128(base_asset_reserve.raw())
            .checked_mul(Wide::from_i128(quote_asset_reserve.raw()))?;
        let sqrt_k = k.integer_sqrt()?.to_i128()?;

        Ok(Self {
            base_asset_reserve,
            quote_asset_reserve,
            sqrt_k: ScaledAmount::new(sqrt_k, Scale::RESERVE),
            peg_multiplier,
            cumulative_funding_rate: ScaledAmount::zero(Scale::FUNDING_RATE),
            total_fee: ScaledAmount::zero(Scale::QUOTE),
            total_fee_minus_distributions: ScaledAmount::zero(Scale::QUOTE),
        })
    }

    /// Independent copy for simulated swaps and rescaling
    pub fn fork(&self) -> Curve {
        Curve {
            base_asset_reserve: self.base_asset_reserve,
            quote_asset_reserve: self.quote_asset_reserve,
            sqrt_k: self.sqrt_k,
            peg_multiplier: self.peg_multiplier,
            cumulative_funding_rate: self.cumulative_funding_rate,
            total_fee: self.total_fee,
            total_fee_minus_distributions: self.total_fee_minus_distributions,
        }
    }

    pub fn reserves(&self) -> Reserves {
        Reserves {
            base: self.base_asset_reserve,
            quote: self.quote_asset_reserve,
        }
    }

    /// Overwrite base/quote reserves, leaving k, peg and fees untouched
    pub fn set_reserves(&mut self, reserves: Reserves) {
        self.base_asset_reserve = reserves.base;
        self.quote_asset_reserve = reserves.quote;
    }

    /// Invariant k = sqrt_k² at reserve precision squared
    pub fn invariant(&self) -> Result<Wide, AmmError> {
        let sqrt_k = Wide::from_i128(self.sqrt_k.raw());
        sqrt_k.checked_mul(sqrt_k)
    }

    /// Price of one base unit in quote terms (mark price precision)
    pub fn mark_price(&self) -> Result<ScaledAmount, AmmError> {
        self.price_at(self.reserves())
    }

    /// Mark price the curve would show at `reserves`, using this curve's peg
    pub fn price_at(&self, reserves: Reserves) -> Result<ScaledAmount, AmmError> {
        reserves
            .quote
            .mul_div(self.peg_multiplier, reserves.base, Scale::MARK_PRICE)
    }

    /// Reserves after swapping `amount` of base in `direction`, without mutating
    pub fn reserves_after_base_swap(
        &self,
        amount: ScaledAmount,
        direction: SwapDirection,
    ) -> Result<Reserves, AmmError> {
        let result = swap_output(
            self.base_asset_reserve.raw(),
            amount.abs().raw(),
            direction,
            self.sqrt_k.raw(),
        )?;
        Ok(Reserves {
            base: ScaledAmount::new(result.new_input_reserve, Scale::RESERVE),
            quote: ScaledAmount::new(result.new_output_reserve, Scale::RESERVE),
        })
    }

    /// Reserves after closing a position of signed size `base_asset_amount`
    pub fn reserves_after_close(
        &self,
        base_asset_amount: ScaledAmount,
    ) -> Result<Reserves, AmmError> {
        let direction = PositionDirection::to_close(base_asset_amount.raw());
        self.reserves_after_base_swap(base_asset_amount.abs(), direction.base_swap_direction())
    }

    /// Apply the closing swap of a position to this curve
    pub fn close(&mut self, base_asset_amount: ScaledAmount) -> Result<(), AmmError> {
        let reserves = self.reserves_after_close(base_asset_amount)?;
        self.set_reserves(reserves);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(units: i64) -> Curve {
        Curve::new(
            ScaledAmount::from_units(units, Scale::RESERVE),
            ScaledAmount::from_units(units, Scale::RESERVE),
            ScaledAmount::from_units(1, Scale::PEG),
        )
        .unwrap()
    }

    #[test]
    fn test_new_derives_sqrt_k() {
        let curve = Curve::new(
            ScaledAmount::from_units(400, Scale::RESERVE),
            ScaledAmount::from_units(100, Scale::RESERVE),
            ScaledAmount::from_units(1, Scale::PEG),
        )
        .unwrap();
        assert_eq!(curve.sqrt_k, ScaledAmount::from_units(200, Scale::RESERVE));
    }

    #[test]
    fn test_new_rejects_empty_reserves() {
        let result = Curve::new(
            ScaledAmount::zero(Scale::RESERVE),
            ScaledAmount::from_units(100, Scale::RESERVE),
            ScaledAmount::from_units(1, Scale::PEG),
        );
        assert_eq!(result, Err(AmmError::InvalidReserves));
    }

    #[test]
    fn test_mark_price_uses_peg() {
        let mut curve = balanced(1_000_000);
        assert_eq!(curve.mark_price().unwrap(), ScaledAmount::from_units(1, Scale::MARK_PRICE));

        curve.peg_multiplier = ScaledAmount::new(42_500, Scale::PEG);
        assert_eq!(curve.mark_price().unwrap(), ScaledAmount::new(425_000_000_000, Scale::MARK_PRICE));
    }

    #[test]
    fn test_fork_is_independent() {
        let canonical = balanced(1_000_000);
        let mut fork = canonical.fork();
        fork.close(ScaledAmount::from_units(10, Scale::RESERVE)).unwrap();

        assert_ne!(fork.base_asset_reserve, canonical.base_asset_reserve);
        assert_eq!(canonical, balanced(1_000_000));
        assert_eq!(fork.sqrt_k, canonical.sqrt_k);
    }

    #[test]
    fn test_closing_long_adds_base() {
        let curve = balanced(1_000_000);
        let after = curve
            .reserves_after_close(ScaledAmount::from_units(10, Scale::RESERVE))
            .unwrap();
        assert_eq!(after.base, ScaledAmount::from_units(1_000_010, Scale::RESERVE));
        assert!(after.quote.raw() < curve.quote_asset_reserve.raw());
        // Price falls after longs sell
        assert!(curve.price_at(after).unwrap().raw() < curve.mark_price().unwrap().raw());
    }

    #[test]
    fn test_closing_short_removes_base() {
        let curve = balanced(1_000_000);
        let after = curve
            .reserves_after_close(ScaledAmount::from_units(-10, Scale::RESERVE))
            .unwrap();
        assert_eq!(after.base, ScaledAmount::from_units(999_990, Scale::RESERVE));
        assert!(after.quote.raw() > curve.quote_asset_reserve.raw());
    }

    #[test]
    fn test_closing_nothing_keeps_reserves() {
        let curve = balanced(1_000_000);
        let after = curve.reserves_after_close(ScaledAmount::zero(Scale::RESERVE)).unwrap();
        assert_eq!(after, curve.reserves());
    }
}
