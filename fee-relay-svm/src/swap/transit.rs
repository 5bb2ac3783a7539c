use async_trait::async_trait;
use fee_relay::Network;
use solana_pubkey::Pubkey;

use crate::chain::{ChainStateClient, TokenAccount};
use crate::error::FeeRelayerError;
use crate::pool::Pool;
use crate::program::transit_token_account_address;

/// Decides which transit token a route uses and whether the user's transit
/// token account has to be created.
#[async_trait]
pub trait TransitTokenAccountManager: Send + Sync {
    /// The transit token account of `user` for `pools` under the relay
    /// program of `network`, or `None` for a one-hop route.
    fn get_transit_token(
        &self,
        user: &Pubkey,
        pools: &[Pool],
        network: Network,
    ) -> Option<TokenAccount>;

    /// Whether `transit_token` must be created before swapping through it.
    async fn needs_create_transit_token_account(
        &self,
        transit_token: Option<&TokenAccount>,
    ) -> Result<bool, FeeRelayerError>;
}

/// [`TransitTokenAccountManager`] backed by on-chain state.
#[derive(Debug)]
pub struct ChainTransitTokenAccountManager<'a, C> {
    chain: &'a C,
}

impl<'a, C: ChainStateClient> ChainTransitTokenAccountManager<'a, C> {
    /// Creates a manager reading account state from `chain`.
    pub const fn new(chain: &'a C) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl<'a, C: ChainStateClient> TransitTokenAccountManager for ChainTransitTokenAccountManager<'a, C> {
    fn get_transit_token(
        &self,
        user: &Pubkey,
        pools: &[Pool],
        network: Network,
    ) -> Option<TokenAccount> {
        let [first, _] = pools else {
            return None;
        };
        let mint = first.token_b_mint;
        let address = transit_token_account_address(user, &mint, network);
        Some(TokenAccount::new(address, mint))
    }

    async fn needs_create_transit_token_account(
        &self,
        transit_token: Option<&TokenAccount>,
    ) -> Result<bool, FeeRelayerError> {
        let Some(transit_token) = transit_token else {
            return Ok(false);
        };
        let info = self.chain.get_token_account(&transit_token.address).await?;
        // a stale account left over from another mint is recreated too
        Ok(info.is_none_or(|info| info.mint != transit_token.mint))
    }
}
