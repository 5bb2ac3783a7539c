//! Slippage tolerance applied to integer token amounts.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::FeeError;

/// Maximum adverse price movement accepted between quoting and executing a
/// swap, as a fraction in `[0, 1)`.
///
/// Serializes as a decimal string (`"0.01"` for one percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Slippage(Decimal);

impl Slippage {
    /// No tolerance.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a slippage from a fraction.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::InvalidSlippage`] unless `0 <= fraction < 1`.
    pub fn new(fraction: Decimal) -> Result<Self, FeeError> {
        if fraction.is_sign_negative() || fraction >= Decimal::ONE {
            return Err(FeeError::InvalidSlippage(fraction));
        }
        Ok(Self(fraction))
    }

    /// Creates a slippage from basis points (`100` is one percent).
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::InvalidSlippage`] for `bps >= 10_000`.
    pub fn from_bps(bps: u32) -> Result<Self, FeeError> {
        Self::new(Decimal::new(i64::from(bps), 4))
    }

    /// The tolerance as a fraction.
    #[must_use]
    pub const fn fraction(&self) -> Decimal {
        self.0
    }

    /// Lowest amount accepted when `estimated` is expected: `floor(estimated * (1 - s))`.
    ///
    /// Returns `None` if the result does not fit in `u64`.
    #[must_use]
    pub fn minimum_out(&self, estimated: u64) -> Option<u64> {
        Decimal::from(estimated)
            .checked_mul(Decimal::ONE - self.0)?
            .floor()
            .to_u64()
    }

    /// Amount that must be estimated so that `minimum_out` still clears after
    /// slippage: `ceil(minimum / (1 - s))`.
    ///
    /// Returns `None` if the result does not fit in `u64`.
    #[must_use]
    pub fn estimated_for_minimum(&self, minimum: u64) -> Option<u64> {
        Decimal::from(minimum)
            .checked_div(Decimal::ONE - self.0)?
            .ceil()
            .to_u64()
    }
}

impl Default for Slippage {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Slippage {
    type Error = FeeError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Slippage> for Decimal {
    fn from(value: Slippage) -> Self {
        value.0
    }
}

impl FromStr for Slippage {
    type Err = FeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fraction = Decimal::from_str(s).map_err(|_| FeeError::InvalidSlippageFormat(s.into()))?;
        Self::new(fraction)
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
