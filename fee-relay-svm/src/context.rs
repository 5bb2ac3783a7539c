//! Per-operation snapshot of relay and chain state.

use fee_relay::UsageStatus;
use solana_pubkey::Pubkey;

use crate::chain::{ChainStateClient, RelayServiceClient};
use crate::error::FeeRelayerError;
use crate::program::{TOKEN_ACCOUNT_LEN, user_relay_address};

/// Whether the user's relay account exists, and its balance if it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayAccountStatus {
    /// The relay account has never been funded.
    NotYetCreated,
    /// The relay account exists with `balance` lamports.
    Created {
        /// Lamport balance.
        balance: u64,
    },
}

impl RelayAccountStatus {
    /// Lamport balance, or `None` if the account does not exist.
    #[must_use]
    pub const fn balance(&self) -> Option<u64> {
        match self {
            Self::NotYetCreated => None,
            Self::Created { balance } => Some(*balance),
        }
    }
}

/// Immutable snapshot of everything the fee calculator needs.
///
/// Relay balance and usage quota change between operations, so a context is
/// built once per operation and thrown away afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationContext {
    minimum_token_account_balance: u64,
    minimum_relay_account_balance: u64,
    fee_payer_address: Pubkey,
    lamports_per_signature: u64,
    relay_account_status: RelayAccountStatus,
    usage_status: UsageStatus,
}

impl CompensationContext {
    /// Creates a context from already fetched values.
    #[must_use]
    pub const fn new(
        minimum_token_account_balance: u64,
        minimum_relay_account_balance: u64,
        fee_payer_address: Pubkey,
        lamports_per_signature: u64,
        relay_account_status: RelayAccountStatus,
        usage_status: UsageStatus,
    ) -> Self {
        Self {
            minimum_token_account_balance,
            minimum_relay_account_balance,
            fee_payer_address,
            lamports_per_signature,
            relay_account_status,
            usage_status,
        }
    }

    /// Fetches a fresh context for `user`.
    ///
    /// Requests are awaited one after another; the first failure aborts.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRelayerError::Client`] or [`FeeRelayerError::Relay`] when
    /// a collaborator request fails.
    pub async fn load<C, R>(chain: &C, relay: &R, user: &Pubkey) -> Result<Self, FeeRelayerError>
    where
        C: ChainStateClient + ?Sized,
        R: RelayServiceClient + ?Sized,
    {
        let minimum_token_account_balance = chain
            .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN)
            .await?;
        let minimum_relay_account_balance = chain.get_minimum_balance_for_rent_exemption(0).await?;
        let lamports_per_signature = chain.get_lamports_per_signature().await?;
        let relay_address = user_relay_address(user, chain.network());
        let relay_account_status = match chain.get_account_lamports(&relay_address).await? {
            Some(balance) => RelayAccountStatus::Created { balance },
            None => RelayAccountStatus::NotYetCreated,
        };
        let fee_payer_address = relay.get_fee_payer().await?;
        let usage_status = relay.get_usage_status(user).await?;

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            user = %user,
            relay_account = %relay_address,
            ?relay_account_status,
            lamports_per_signature,
            "Compensation context loaded"
        );

        Ok(Self::new(
            minimum_token_account_balance,
            minimum_relay_account_balance,
            fee_payer_address,
            lamports_per_signature,
            relay_account_status,
            usage_status,
        ))
    }

    /// Rent-exempt minimum of an SPL token account.
    #[must_use]
    pub const fn minimum_token_account_balance(&self) -> u64 {
        self.minimum_token_account_balance
    }

    /// Rent-exempt minimum of the relay account.
    #[must_use]
    pub const fn minimum_relay_account_balance(&self) -> u64 {
        self.minimum_relay_account_balance
    }

    /// The relay's fee payer.
    #[must_use]
    pub const fn fee_payer_address(&self) -> &Pubkey {
        &self.fee_payer_address
    }

    /// Current fee per signature.
    #[must_use]
    pub const fn lamports_per_signature(&self) -> u64 {
        self.lamports_per_signature
    }

    /// State of the user's relay account.
    #[must_use]
    pub const fn relay_account_status(&self) -> RelayAccountStatus {
        self.relay_account_status
    }

    /// The user's free-usage allowance.
    #[must_use]
    pub const fn usage_status(&self) -> &UsageStatus {
        &self.usage_status
    }
}
