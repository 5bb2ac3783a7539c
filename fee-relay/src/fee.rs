//! Fee amounts split by category.
//!
//! A [`FeeAmount`] separates the network (signature) part of a fee from the
//! part that funds new accounts up to their rent-exempt minimum. Keeping the
//! two apart matters: a free-usage quota can sponsor the former but never the
//! latter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeeError;

/// A fee that is not expressed in lamports, e.g. a bridge or protocol fee.
///
/// These entries travel with a [`FeeAmount`] for display and bookkeeping and
/// are never folded into [`FeeAmount::total`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherFee {
    /// Fee amount in `unit`.
    pub amount: Decimal,
    /// Unit or token symbol the amount is denominated in.
    pub unit: String,
}

impl OtherFee {
    /// Creates a new non-native fee entry.
    pub fn new(amount: Decimal, unit: impl Into<String>) -> Self {
        Self {
            amount,
            unit: unit.into(),
        }
    }
}

/// A fee split into category buckets, in base units of the fee asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAmount {
    /// Network fee: signatures and relay-side transaction costs.
    pub transaction: u64,
    /// Rent-exempt balances for accounts the operation creates.
    pub account_balances: u64,
    /// Additional fees in other units, carried as metadata.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub others: Vec<OtherFee>,
}

impl FeeAmount {
    /// The all-zero fee.
    pub const ZERO: Self = Self {
        transaction: 0,
        account_balances: 0,
        others: Vec::new(),
    };

    /// Creates a fee with the given buckets and no additional fees.
    #[must_use]
    pub const fn new(transaction: u64, account_balances: u64) -> Self {
        Self {
            transaction,
            account_balances,
            others: Vec::new(),
        }
    }

    /// Attaches a non-native fee entry.
    #[must_use]
    pub fn with_other(mut self, other: OtherFee) -> Self {
        self.others.push(other);
        self
    }

    /// Sum of the native buckets.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::Overflow`] if the sum does not fit in `u64`.
    pub fn total(&self) -> Result<u64, FeeError> {
        self.transaction
            .checked_add(self.account_balances)
            .ok_or(FeeError::Overflow)
    }

    /// Returns `true` when both native buckets are zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.transaction == 0 && self.account_balances == 0
    }

    /// Adds two fees bucket by bucket, concatenating the additional fees.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::Overflow`] if either bucket overflows.
    pub fn checked_add(&self, other: &Self) -> Result<Self, FeeError> {
        let transaction = self
            .transaction
            .checked_add(other.transaction)
            .ok_or(FeeError::Overflow)?;
        let account_balances = self
            .account_balances
            .checked_add(other.account_balances)
            .ok_or(FeeError::Overflow)?;
        let mut others = self.others.clone();
        others.extend(other.others.iter().cloned());
        Ok(Self {
            transaction,
            account_balances,
            others,
        })
    }
}
