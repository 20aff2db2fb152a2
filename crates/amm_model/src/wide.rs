//! Signed 512-bit intermediates
//!
//! Curve cross products (reserve × reserve × peg × scale) overflow `i128`
//! long before the final division brings them back into range. `Wide`
//! carries those products at full width so every scale-reducing division
//! happens exactly once, at the end.

use core::cmp::Ordering;
use core::ops::Neg;

use uint::construct_uint;

use crate::AmmError;

construct_uint! {
    /// Unsigned 512-bit magnitude backing [`Wide`]
    pub struct U512(8);
}

/// Sign-magnitude 512-bit integer. Zero is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wide {
    negative: bool,
    magnitude: U512,
}

impl Wide {
    fn new(negative: bool, magnitude: U512) -> Self {
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }

    pub fn zero() -> Self {
        Self::new(false, U512::zero())
    }

    pub fn from_i128(value: i128) -> Self {
        Self::new(value < 0, U512::from(value.unsigned_abs()))
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_positive(&self) -> bool {
        !self.negative && !self.magnitude.is_zero()
    }

    pub fn abs(self) -> Self {
        Self::new(false, self.magnitude)
    }

    pub fn checked_mul(self, rhs: Wide) -> Result<Wide, AmmError> {
        let magnitude = self
            .magnitude
            .checked_mul(rhs.magnitude)
            .ok_or(AmmError::Overflow)?;
        Ok(Self::new(self.negative != rhs.negative, magnitude))
    }

    /// Truncating division (rounds toward zero, like `i128 /`)
    pub fn checked_div(self, rhs: Wide) -> Result<Wide, AmmError> {
        if rhs.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        let magnitude = self.magnitude / rhs.magnitude;
        Ok(Self::new(self.negative != rhs.negative, magnitude))
    }

    pub fn checked_add(self, rhs: Wide) -> Result<Wide, AmmError> {
        if self.negative == rhs.negative {
            let magnitude = self
                .magnitude
                .checked_add(rhs.magnitude)
                .ok_or(AmmError::Overflow)?;
            return Ok(Self::new(self.negative, magnitude));
        }

        // Opposite signs: the larger magnitude keeps its sign
        match self.magnitude.cmp(&rhs.magnitude) {
            Ordering::Less => Ok(Self::new(rhs.negative, rhs.magnitude - self.magnitude)),
            _ => Ok(Self::new(self.negative, self.magnitude - rhs.magnitude)),
        }
    }

    pub fn checked_sub(self, rhs: Wide) -> Result<Wide, AmmError> {
        self.checked_add(-rhs)
    }

    /// Multiply every factor, then divide once by the product of divisors
    pub fn mul_div(factors: &[i128], divisors: &[i128]) -> Result<Wide, AmmError> {
        let mut numerator = Wide::from_i128(1);
        for factor in factors {
            numerator = numerator.checked_mul(Wide::from_i128(*factor))?;
        }
        let mut denominator = Wide::from_i128(1);
        for divisor in divisors {
            denominator = denominator.checked_mul(Wide::from_i128(*divisor))?;
        }
        numerator.checked_div(denominator)
    }

    /// Largest `n` with `n² <= self`
    pub fn integer_sqrt(self) -> Result<Wide, AmmError> {
        if self.negative {
            return Err(AmmError::InvalidReserves);
        }
        Ok(Self::new(false, self.magnitude.integer_sqrt()))
    }

    /// Narrow back to `i128`
    pub fn to_i128(self) -> Result<i128, AmmError> {
        if self.magnitude.bits() > 127 {
            return Err(AmmError::Overflow);
        }
        let magnitude = self.magnitude.low_u128() as i128;
        Ok(if self.negative { -magnitude } else { magnitude })
    }
}

impl From<i128> for Wide {
    fn from(value: i128) -> Self {
        Self::from_i128(value)
    }
}

impl Neg for Wide {
    type Output = Wide;

    fn neg(self) -> Wide {
        Self::new(!self.negative, self.magnitude)
    }
}

impl PartialOrd for Wide {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Wide {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
        }
    }
}
