//! Solana collaborators consumed by the compensation engine.
//!
//! The engine never talks to the network itself. Chain state and relay
//! service state are reached through the traits in this module, which the
//! embedding application implements over its RPC transport. Retry, timeout
//! and cancellation policy belong to those implementations.
//!
//! # Key Types
//!
//! - [`ChainStateClient`] - rent-exemption minimums, signature fees, account lookups
//! - [`RelayServiceClient`] - relay fee payer and free-usage allowance
//! - [`TokenAccount`] - an SPL token account address paired with its mint
//! - [`TokenAccountInfo`] - decoded on-chain token account state

use async_trait::async_trait;
use fee_relay::{Network, UsageStatus};
use solana_pubkey::Pubkey;

/// An SPL token account address paired with its mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenAccount {
    /// Token account address.
    pub address: Pubkey,
    /// Mint of the tokens held.
    pub mint: Pubkey,
}

impl TokenAccount {
    /// Creates a token account reference.
    #[must_use]
    pub const fn new(address: Pubkey, mint: Pubkey) -> Self {
        Self { address, mint }
    }
}

/// Decoded on-chain state of an SPL token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountInfo {
    /// Mint of the tokens held.
    pub mint: Pubkey,
    /// Owner of the account.
    pub owner: Pubkey,
    /// Token balance in base units.
    pub amount: u64,
}

/// Error returned by a [`ChainStateClient`].
#[derive(Debug, thiserror::Error)]
#[error("Chain state request failed: {0}")]
pub struct ChainClientError(pub String);

/// Error returned by a [`RelayServiceClient`].
#[derive(Debug, thiserror::Error)]
#[error("Relay service request failed: {0}")]
pub struct RelayServiceError(pub String);

/// Read access to Solana chain state.
#[async_trait]
pub trait ChainStateClient: Send + Sync {
    /// The cluster this client is connected to.
    fn network(&self) -> Network;

    /// Minimum lamports an account of `data_len` bytes needs to be rent exempt.
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ChainClientError>;

    /// Current fee per signature in lamports.
    async fn get_lamports_per_signature(&self) -> Result<u64, ChainClientError>;

    /// Lamport balance of `address`, or `None` if the account does not exist.
    async fn get_account_lamports(&self, address: &Pubkey) -> Result<Option<u64>, ChainClientError>;

    /// Decoded SPL token account at `address`, or `None` if it does not exist
    /// or is not a token account.
    async fn get_token_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<TokenAccountInfo>, ChainClientError>;
}

/// Access to the off-chain relay service.
#[async_trait]
pub trait RelayServiceClient: Send + Sync {
    /// Address of the relay's fee payer.
    async fn get_fee_payer(&self) -> Result<Pubkey, RelayServiceError>;

    /// Free-usage allowance of `user` for the current period.
    async fn get_usage_status(&self, user: &Pubkey) -> Result<UsageStatus, RelayServiceError>;
}
