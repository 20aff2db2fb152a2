//! AMM Model - Fixed-point constant product curve math (x·y=k)
//!
//! This crate holds the pure, allocation-free core of the exposure and
//! settlement analytics: scaled integer arithmetic, the per-market curve,
//! position valuation against a curve, and the budgeted-k solver that folds
//! undistributed fees back into a curve's invariant.
//!
//! Nothing here mutates shared state. What-if valuation always runs on a
//! [`Curve::fork`].

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod budget;
pub mod curve;
pub mod math;
pub mod position;
pub mod precision;
pub mod wide;

pub use budget::{calculate_budgeted_k, KMultiplier};
pub use curve::{Curve, Reserves};
pub use math::{swap_output, PositionDirection, SwapDirection, SwapResult};
pub use position::{
    calculate_base_asset_value, calculate_funding_pnl, calculate_position_pnl, MarketPosition,
};
pub use precision::{Scale, ScaledAmount};
pub use wide::Wide;

/// Error types for curve arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmError {
    /// Division by zero (zero reserve, zero exposure, degenerate solver input)
    DivisionByZero,
    /// Two amounts of different scales were combined without rescaling
    ScaleMismatch,
    /// Invalid reserves (zero or negative)
    InvalidReserves,
    /// Invalid amount (negative swap size)
    InvalidAmount,
    /// Insufficient liquidity in the curve
    InsufficientLiquidity,
    /// Arithmetic overflow
    Overflow,
}

impl core::fmt::Display for AmmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            AmmError::DivisionByZero => "division by zero",
            AmmError::ScaleMismatch => "fixed-point scale mismatch",
            AmmError::InvalidReserves => "invalid curve reserves",
            AmmError::InvalidAmount => "invalid swap amount",
            AmmError::InsufficientLiquidity => "insufficient curve liquidity",
            AmmError::Overflow => "arithmetic overflow",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AmmError {}
