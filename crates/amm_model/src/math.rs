//! Constant product swap math (x·y=k)

use crate::wide::Wide;
use crate::AmmError;

/// Which way the input reserve moves during a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// Input is paid into the curve
    Add,
    /// Input is taken out of the curve
    Remove,
}

/// Trader direction of a fill against the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDirection {
    Long,
    Short,
}

impl PositionDirection {
    /// Direction of the fill that closes a position of this signed size
    ///
    /// Closing a positive (long) base amount sells base: SHORT.
    /// Anything else, including zero, closes LONG.
    pub fn to_close(base_asset_amount: i128) -> Self {
        if base_asset_amount > 0 {
            PositionDirection::Short
        } else {
            PositionDirection::Long
        }
    }

    /// Swap direction when base is the input asset
    ///
    /// A long takes base out of the curve; a short pays base into it.
    pub fn base_swap_direction(self) -> SwapDirection {
        match self {
            PositionDirection::Long => SwapDirection::Remove,
            PositionDirection::Short => SwapDirection::Add,
        }
    }
}

/// Reserves after a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
    /// Reserve of the asset that was swapped in (or out)
    pub new_input_reserve: i128,
    /// Opposite reserve, re-derived from the invariant
    pub new_output_reserve: i128,
}

/// Move `amount` of the input asset and re-derive the output reserve
///
/// - x1 = x0 ± Δx
/// - y1 = sqrt_k² / x1 (truncating)
///
/// The invariant is taken from `sqrt_k` rather than from `x0·y0`, so a curve
/// whose stored reserves drifted from `sqrt_k²` by truncation still swaps
/// along the intended hyperbola.
///
/// # Arguments
/// * `input_reserve` - Current reserve of the input asset (reserve precision)
/// * `amount` - Unsigned swap size (reserve precision)
/// * `direction` - Whether the input is added to or removed from the curve
/// * `sqrt_k` - Square root of the curve invariant (reserve precision)
pub fn swap_output(
    input_reserve: i128,
    amount: i128,
    direction: SwapDirection,
    sqrt_k: i128,
) -> Result<SwapResult, AmmError> {
    if input_reserve <= 0 || sqrt_k <= 0 {
        return Err(AmmError::InvalidReserves);
    }
    if amount < 0 {
        return Err(AmmError::InvalidAmount);
    }

    let new_input_reserve = match direction {
        SwapDirection::Add => input_reserve.checked_add(amount),
        SwapDirection::Remove => input_reserve.checked_sub(amount),
    }
    .ok_or(AmmError::Overflow)?;

    if new_input_reserve <= 0 {
        return Err(AmmError::InsufficientLiquidity);
    }

    let new_output_reserve = Wide::mul_div(&[sqrt_k, sqrt_k], &[new_input_reserve])?.to_i128()?;

    Ok(SwapResult {
        new_input_reserve,
        new_output_reserve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scale;

    const ONE: i128 = Scale::RESERVE.one();

    #[test]
    fn test_close_direction() {
        assert_eq!(PositionDirection::to_close(5), PositionDirection::Short);
        assert_eq!(PositionDirection::to_close(-5), PositionDirection::Long);
        assert_eq!(PositionDirection::to_close(0), PositionDirection::Long);

        assert_eq!(PositionDirection::Short.base_swap_direction(), SwapDirection::Add);
        assert_eq!(PositionDirection::Long.base_swap_direction(), SwapDirection::Remove);
    }

    #[test]
    fn test_add_base_lowers_quote() {
        // x = y = 1000, sell 10 base into the curve
        let x = 1000 * ONE;
        let result = swap_output(x, 10 * ONE, SwapDirection::Add, x).unwrap();

        assert_eq!(result.new_input_reserve, 1010 * ONE);
        assert!(result.new_output_reserve < x);

        // Invariant holds up to truncation of the output reserve
        let k = x * x;
        let product = result.new_input_reserve * result.new_output_reserve;
        assert!(product <= k);
        assert!(k - product < result.new_input_reserve);
    }

    #[test]
    fn test_round_trip_restores_reserves() {
        let x = 1000 * ONE;
        let out = swap_output(x, 10 * ONE, SwapDirection::Add, x).unwrap();
        let back = swap_output(out.new_input_reserve, 10 * ONE, SwapDirection::Remove, x).unwrap();

        assert_eq!(back.new_input_reserve, x);
        assert_eq!(back.new_output_reserve, x);
    }

    #[test]
    fn test_insufficient_liquidity() {
        let x = 1000 * ONE;

        // Try to remove the entire base reserve
        let result = swap_output(x, 1000 * ONE, SwapDirection::Remove, x);
        assert!(matches!(result, Err(AmmError::InsufficientLiquidity)));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            swap_output(0, ONE, SwapDirection::Add, ONE),
            Err(AmmError::InvalidReserves)
        );
        assert_eq!(
            swap_output(ONE, -1, SwapDirection::Add, ONE),
            Err(AmmError::InvalidAmount)
        );
    }

    #[test]
    fn test_zero_amount_is_identity_on_balanced_curve() {
        let x = 1000 * ONE;
        let result = swap_output(x, 0, SwapDirection::Remove, x).unwrap();
        assert_eq!(result.new_input_reserve, x);
        assert_eq!(result.new_output_reserve, x);
    }
}
