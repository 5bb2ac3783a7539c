//! Error types for core fee accounting.

use rust_decimal::Decimal;

/// Errors produced by fee arithmetic and slippage validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    /// A checked lamport computation overflowed.
    #[error("Fee arithmetic overflow")]
    Overflow,
    /// Slippage is outside `[0, 1)`.
    #[error("Slippage must be in [0, 1), got {0}")]
    InvalidSlippage(Decimal),
    /// Slippage string is not a decimal number.
    #[error("Can not parse slippage: {0}")]
    InvalidSlippageFormat(String),
}
