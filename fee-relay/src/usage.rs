//! Free-transaction allowance tracking.

use serde::{Deserialize, Serialize};

/// Consumption of the relay's free-transaction allowance for one user.
///
/// The relay sponsors network fees for a bounded number of transactions and a
/// bounded lamport amount per period. Both limits must hold for a fee to be
/// sponsored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatus {
    /// Number of sponsored transactions allowed in the period.
    pub max_usage: u32,
    /// Number of sponsored transactions already used.
    pub current_usage: u32,
    /// Lamports the relay sponsors in the period.
    pub max_amount: u64,
    /// Lamports already sponsored.
    pub amount_used: u64,
}

impl UsageStatus {
    /// Creates a usage status.
    #[must_use]
    pub const fn new(max_usage: u32, current_usage: u32, max_amount: u64, amount_used: u64) -> Self {
        Self {
            max_usage,
            current_usage,
            max_amount,
            amount_used,
        }
    }

    /// Checks whether `transaction_fee` would be sponsored.
    ///
    /// With `for_next_transaction` the check is made as if one more sponsored
    /// transaction had already been counted, so `transaction_fee` must be the
    /// combined fee of both transactions.
    #[must_use]
    pub fn is_free_transaction_fee_available(
        &self,
        transaction_fee: u64,
        for_next_transaction: bool,
    ) -> bool {
        if self.remaining_usage() <= u32::from(for_next_transaction) {
            return false;
        }
        self.amount_used <= self.max_amount && transaction_fee <= self.remaining_amount()
    }

    /// Remaining sponsored transactions in the period.
    #[must_use]
    pub const fn remaining_usage(&self) -> u32 {
        self.max_usage.saturating_sub(self.current_usage)
    }

    /// Remaining sponsored lamports in the period.
    #[must_use]
    pub const fn remaining_amount(&self) -> u64 {
        self.max_amount.saturating_sub(self.amount_used)
    }
}
