//! Budgeted-k solver
//!
//! Finds the multiplier `p` to apply to base reserve, quote reserve and
//! sqrt(k) so that the curve's valuation of the market's net exposure moves
//! by exactly a given quote `cost`, with the peg held fixed.
//!
//! Closed form of `(1/(x+d) − p/(x·p+d)) · y · d · Q = C`:
//!
//! ```text
//! p = d(y·d·Q − C(x+d)) / (C·x(x+d) + y·d²·Q)
//! ```
//!
//! with `x` base reserve, `y` quote reserve, `d` net base exposure, `Q` peg
//! and `C = −cost`.
//!
//! TODO: assumes k = x * y. A different invariant shape would need
//! `(y(1−p) + k·p²/(x·p+d) − k/(x+d)) · Q = C` solved for p instead.

use crate::curve::Curve;
use crate::precision::{Scale, ScaledAmount};
use crate::wide::Wide;
use crate::AmmError;

/// Rational multiplier `numerator / denominator` for the curve invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMultiplier {
    pub numerator: Wide,
    pub denominator: Wide,
}

impl KMultiplier {
    pub fn identity() -> Self {
        Self {
            numerator: Wide::from_i128(1),
            denominator: Wide::from_i128(1),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.numerator == self.denominator
    }

    /// True when applying the multiplier keeps reserves positive
    pub fn is_positive(&self) -> bool {
        !self.denominator.is_zero()
            && !self.numerator.is_zero()
            && self.numerator.is_negative() == self.denominator.is_negative()
    }

    /// `amount × numerator / denominator`, truncated
    pub fn apply(&self, amount: ScaledAmount) -> Result<ScaledAmount, AmmError> {
        let raw = Wide::from_i128(amount.raw())
            .checked_mul(self.numerator)?
            .checked_div(self.denominator)?
            .to_i128()?;
        Ok(ScaledAmount::new(raw, amount.scale()))
    }

    /// Multiplier as a decimal in `scale`, for display
    pub fn as_ratio(&self, scale: Scale) -> Result<ScaledAmount, AmmError> {
        self.apply(ScaledAmount::new(scale.one(), scale))
    }
}

/// Solve for the k multiplier that makes the curve absorb `cost`
///
/// # Arguments
/// * `curve` - Curve to rescale (not modified)
/// * `net_base_asset_amount` - Signed net exposure `d` (reserve precision)
/// * `cost` - Quote to hand back to positions (quote precision); positive
///   grows the net exposure's value
///
/// # Returns
/// * Identity when `d == 0` (the system is underdetermined)
/// * `AmmError::DivisionByZero` if the denominator vanishes
pub fn calculate_budgeted_k(
    curve: &Curve,
    net_base_asset_amount: ScaledAmount,
    cost: ScaledAmount,
) -> Result<KMultiplier, AmmError> {
    if net_base_asset_amount.scale() != Scale::RESERVE || cost.scale() != Scale::QUOTE {
        return Err(AmmError::ScaleMismatch);
    }
    if net_base_asset_amount.is_zero() {
        return Ok(KMultiplier::identity());
    }

    let x = Wide::from_i128(curve.base_asset_reserve.raw());
    let y = Wide::from_i128(curve.quote_asset_reserve.raw());
    let d = Wide::from_i128(net_base_asset_amount.raw());
    let q = Wide::from_i128(curve.peg_multiplier.raw());
    let c = Wide::from_i128(-cost.raw());

    // Every term is carried at RESERVE³ · PEG before the one division.
    // Cost terms are quote-denominated and get lifted by RESERVE · PEG / QUOTE.
    let cost_to_reserve = Wide::from_i128(Scale::RESERVE.one() * Scale::PEG.one() / Scale::QUOTE.one());

    let x_plus_d = x.checked_add(d)?;
    // y·d·Q
    let ydq = y.checked_mul(d)?.checked_mul(q)?;
    // C(x+d)
    let c_xd = c.checked_mul(x_plus_d)?.checked_mul(cost_to_reserve)?;

    let numerator = d.checked_mul(ydq.checked_sub(c_xd)?)?;
    let denominator = c
        .checked_mul(x)?
        .checked_mul(x_plus_d)?
        .checked_mul(cost_to_reserve)?
        .checked_add(ydq.checked_mul(d)?)?;

    if denominator.is_zero() {
        return Err(AmmError::DivisionByZero);
    }

    // Keep the denominator positive so the sign lives in the numerator
    if denominator.is_negative() {
        return Ok(KMultiplier {
            numerator: -numerator,
            denominator: -denominator,
        });
    }
    Ok(KMultiplier {
        numerator,
        denominator,
    })
}

impl Curve {
    /// Scale base reserve, quote reserve and sqrt(k) by `multiplier`
    ///
    /// Peg, funding and fee counters are left alone; the caller owns the
    /// fee bookkeeping.
    pub fn apply_k_multiplier(&mut self, multiplier: &KMultiplier) -> Result<(), AmmError> {
        if multiplier.is_identity() {
            return Ok(());
        }

        let base = multiplier.apply(self.base_asset_reserve)?;
        let quote = multiplier.apply(self.quote_asset_reserve)?;
        let sqrt_k = multiplier.apply(self.sqrt_k)?;
        if !base.is_positive() || !quote.is_positive() || !sqrt_k.is_positive() {
            return Err(AmmError::InvalidReserves);
        }

        self.base_asset_reserve = base;
        self.quote_asset_reserve = quote;
        self.sqrt_k = sqrt_k;
        Ok(())
    }
}
