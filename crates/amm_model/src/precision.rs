//! Fixed-point amounts with an explicit decimal scale
//!
//! Every curve quantity lives in one of a handful of integer domains
//! (reserve, peg, quote, mark price, margin, funding). A [`ScaledAmount`]
//! carries its [`Scale`] so that combining two domains is always an explicit
//! rescale. Multiplicative operations widen, multiply every factor, and
//! truncate exactly once toward zero.

use core::fmt;

use crate::wide::Wide;
use crate::AmmError;

/// Number of implied decimal places of a fixed-point domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scale {
    decimals: u32,
}

impl Scale {
    /// Base/quote reserves, sqrt(k) and base asset amounts (1e13)
    pub const RESERVE: Scale = Scale::new(13);
    /// Peg multiplier (1e3)
    pub const PEG: Scale = Scale::new(3);
    /// Collateral, cost basis, fees and PnL (1e6)
    pub const QUOTE: Scale = Scale::new(6);
    /// Mark and terminal prices (1e10)
    pub const MARK_PRICE: Scale = Scale::new(10);
    /// Margin ratios, 10_000 = 100% (1e4)
    pub const MARGIN: Scale = Scale::new(4);
    /// Cumulative funding rate: mark price × 1e4 payment precision (1e14)
    pub const FUNDING_RATE: Scale = Scale::new(14);

    /// Only the named domains above are valid; `one()` must fit in an i128
    pub(crate) const fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    pub const fn decimals(self) -> u32 {
        self.decimals
    }

    /// Raw value of 1.0 in this scale
    pub const fn one(self) -> i128 {
        10i128.pow(self.decimals)
    }
}

/// Integer value bound to a decimal scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaledAmount {
    raw: i128,
    scale: Scale,
}

impl ScaledAmount {
    pub const fn new(raw: i128, scale: Scale) -> Self {
        Self { raw, scale }
    }

    pub const fn zero(scale: Scale) -> Self {
        Self { raw: 0, scale }
    }

    /// Whole units, e.g. `from_units(5, Scale::RESERVE)` is 5 base units
    pub const fn from_units(units: i64, scale: Scale) -> Self {
        Self {
            raw: units as i128 * scale.one(),
            scale,
        }
    }

    /// Parse a human-readable decimal, rounding half away from zero
    pub fn from_decimal(value: f64, scale: Scale) -> Result<Self, AmmError> {
        if !value.is_finite() {
            return Err(AmmError::Overflow);
        }
        let scaled = value * scale.one() as f64;
        if scaled >= i128::MAX as f64 || scaled <= i128::MIN as f64 {
            return Err(AmmError::Overflow);
        }
        // `as` truncates, so the half offset rounds away from zero
        let raw = if scaled >= 0.0 {
            (scaled + 0.5) as i128
        } else {
            (scaled - 0.5) as i128
        };
        Ok(Self { raw, scale })
    }

    pub const fn raw(self) -> i128 {
        self.raw
    }

    pub const fn scale(self) -> Scale {
        self.scale
    }

    pub const fn is_zero(self) -> bool {
        self.raw == 0
    }

    pub const fn is_positive(self) -> bool {
        self.raw > 0
    }

    pub const fn is_negative(self) -> bool {
        self.raw < 0
    }

    pub const fn abs(self) -> Self {
        Self {
            raw: self.raw.abs(),
            scale: self.scale,
        }
    }

    pub const fn neg(self) -> Self {
        Self {
            raw: -self.raw,
            scale: self.scale,
        }
    }

    fn same_scale(self, rhs: ScaledAmount) -> Result<(), AmmError> {
        if self.scale != rhs.scale {
            return Err(AmmError::ScaleMismatch);
        }
        Ok(())
    }

    pub fn checked_add(self, rhs: ScaledAmount) -> Result<Self, AmmError> {
        self.same_scale(rhs)?;
        let raw = self.raw.checked_add(rhs.raw).ok_or(AmmError::Overflow)?;
        Ok(Self::new(raw, self.scale))
    }

    pub fn checked_sub(self, rhs: ScaledAmount) -> Result<Self, AmmError> {
        self.same_scale(rhs)?;
        let raw = self.raw.checked_sub(rhs.raw).ok_or(AmmError::Overflow)?;
        Ok(Self::new(raw, self.scale))
    }

    pub fn max(self, rhs: ScaledAmount) -> Result<Self, AmmError> {
        self.same_scale(rhs)?;
        Ok(if rhs.raw > self.raw { rhs } else { self })
    }

    pub fn min(self, rhs: ScaledAmount) -> Result<Self, AmmError> {
        self.same_scale(rhs)?;
        Ok(if rhs.raw < self.raw { rhs } else { self })
    }

    /// Move into another scale (multiply first, then truncate)
    pub fn rescale(self, target: Scale) -> Result<Self, AmmError> {
        let raw = Wide::mul_div(&[self.raw, target.one()], &[self.scale.one()])?.to_i128()?;
        Ok(Self::new(raw, target))
    }

    /// `self × rhs`, expressed in `target`
    pub fn mul(self, rhs: ScaledAmount, target: Scale) -> Result<Self, AmmError> {
        let raw = Wide::mul_div(
            &[self.raw, rhs.raw, target.one()],
            &[self.scale.one(), rhs.scale.one()],
        )?
        .to_i128()?;
        Ok(Self::new(raw, target))
    }

    /// `self ÷ rhs`, expressed in `target`
    pub fn div(self, rhs: ScaledAmount, target: Scale) -> Result<Self, AmmError> {
        if rhs.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        let raw = Wide::mul_div(
            &[self.raw, target.one(), rhs.scale.one()],
            &[rhs.raw, self.scale.one()],
        )?
        .to_i128()?;
        Ok(Self::new(raw, target))
    }

    /// `self × mul ÷ div`, expressed in `target`, truncated once
    pub fn mul_div(
        self,
        mul: ScaledAmount,
        div: ScaledAmount,
        target: Scale,
    ) -> Result<Self, AmmError> {
        if div.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        let raw = Wide::mul_div(
            &[self.raw, mul.raw, div.scale.one(), target.one()],
            &[self.scale.one(), mul.scale.one(), div.raw],
        )?
        .to_i128()?;
        Ok(Self::new(raw, target))
    }

    /// Human-readable value: integer part plus remainder fraction
    pub fn to_decimal(self) -> f64 {
        let one = self.scale.one();
        (self.raw / one) as f64 + (self.raw % one) as f64 / one as f64
    }
}

impl fmt::Display for ScaledAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let one = self.scale.one().unsigned_abs();
        let magnitude = self.raw.unsigned_abs();
        let sign = if self.raw < 0 { "-" } else { "" };
        if self.scale.decimals == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / one,
            magnitude % one,
            width = self.scale.decimals as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_scale_one() {
        assert_eq!(Scale::RESERVE.one(), 10_000_000_000_000);
        assert_eq!(Scale::PEG.one(), 1_000);
        assert_eq!(Scale::QUOTE.one(), 1_000_000);
        assert_eq!(Scale::MARGIN.one(), 10_000);
        assert_eq!(Scale::MARK_PRICE.one(), 10_000_000_000);
        assert_eq!(Scale::FUNDING_RATE.one(), 100_000_000_000_000);
    }

    #[test]
    fn test_mul_truncates_once() {
        // 1.5 quote × 20% margin = 0.3 quote
        let value = ScaledAmount::new(1_500_000, Scale::QUOTE);
        let ratio = ScaledAmount::new(2_000, Scale::MARGIN);
        let requirement = value.mul(ratio, Scale::QUOTE).unwrap();
        assert_eq!(requirement, ScaledAmount::new(300_000, Scale::QUOTE));

        // 0.000001 × 0.5 truncates to zero rather than rounding
        let dust = ScaledAmount::new(1, Scale::QUOTE);
        let half = ScaledAmount::new(5_000, Scale::MARGIN);
        assert!(dust.mul(half, Scale::QUOTE).unwrap().is_zero());

        // negative operands truncate toward zero
        let loss = ScaledAmount::new(-3, Scale::QUOTE);
        assert_eq!(loss.mul(half, Scale::QUOTE).unwrap().raw(), -1);
    }

    #[test]
    fn test_div_across_scales() {
        // 500 quote over 5 base = 100 quote per base
        let quote = ScaledAmount::from_units(500, Scale::QUOTE);
        let base = ScaledAmount::from_units(5, Scale::RESERVE);
        let price = quote.div(base, Scale::QUOTE).unwrap();
        assert_eq!(price, ScaledAmount::from_units(100, Scale::QUOTE));
    }

    #[test]
    fn test_div_by_zero_is_fault() {
        let quote = ScaledAmount::from_units(500, Scale::QUOTE);
        let zero = ScaledAmount::zero(Scale::RESERVE);
        assert_eq!(quote.div(zero, Scale::QUOTE), Err(AmmError::DivisionByZero));
        assert_eq!(
            quote.mul_div(quote, zero, Scale::QUOTE),
            Err(AmmError::DivisionByZero)
        );
    }

    #[test]
    fn test_scale_mismatch_rejected() {
        let quote = ScaledAmount::from_units(1, Scale::QUOTE);
        let base = ScaledAmount::from_units(1, Scale::RESERVE);
        assert_eq!(quote.checked_add(base), Err(AmmError::ScaleMismatch));
        assert_eq!(quote.max(base), Err(AmmError::ScaleMismatch));
    }

    #[test]
    fn test_min_max_abs() {
        let a = ScaledAmount::new(-7, Scale::QUOTE);
        let b = ScaledAmount::new(3, Scale::QUOTE);
        assert_eq!(a.max(b).unwrap(), b);
        assert_eq!(a.min(b).unwrap(), a);
        assert_eq!(a.abs().raw(), 7);
    }

    #[test]
    fn test_rescale() {
        let base = ScaledAmount::new(12_345_678_901_234_567, Scale::RESERVE);
        let quote = base.rescale(Scale::QUOTE).unwrap();
        assert_eq!(quote.raw(), 1_234_567_890);
    }

    #[test]
    fn test_decimal_round_trip() {
        for raw in [0i128, 1, -1, 999_999, 1_234_567, -98_765_432_100, 4_937_519_836_505] {
            let amount = ScaledAmount::new(raw, Scale::QUOTE);
            let back = ScaledAmount::from_decimal(amount.to_decimal(), Scale::QUOTE).unwrap();
            assert_eq!(back, amount, "raw {}", raw);
        }
    }

    #[test]
    fn test_to_decimal_keeps_sign_of_fraction() {
        let amount = ScaledAmount::new(-1_500_000, Scale::QUOTE);
        assert_eq!(amount.to_decimal(), -1.5);
    }

    #[test]
    fn test_display() {
        assert_eq!(ScaledAmount::new(1_500_000, Scale::QUOTE).to_string(), "1.500000");
        assert_eq!(ScaledAmount::new(-42, Scale::PEG).to_string(), "-0.042");
    }
}
