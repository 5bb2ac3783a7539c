//! Relay swap route data and the transaction build pipeline.
//!
//! [`build_swap_data`] resolves the amounts of a one- or two-hop route into
//! [`SwapData`]. The pipeline steps in [`steps`] then turn a
//! [`BuildContext`] into the ordered instruction list the relay accepts, and
//! [`SwapPipeline`] enforces that order at compile time.

mod context;
mod data;
mod pipeline;
pub mod steps;
mod transit;

use solana_keypair::Keypair;
use solana_pubkey::Pubkey;

pub use context::{BuildConfig, BuildContext, BuildEnv};
pub use data::build_swap_data;
pub use pipeline::{
    DestinationChecked, Finalized, Initialized, SourceChecked, SwapEmitted, SwapPipeline,
    TransitChecked,
};
pub use transit::{ChainTransitTokenAccountManager, TransitTokenAccountManager};

/// One pool hop with resolved amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectSwapData {
    /// Swap program ID.
    pub program_id: Pubkey,
    /// Pool state account.
    pub account: Pubkey,
    /// Pool authority.
    pub authority: Pubkey,
    /// Account allowed to move the user's source tokens.
    pub transfer_authority: Pubkey,
    /// Pool vault receiving the input token.
    pub source: Pubkey,
    /// Pool vault paying out the output token.
    pub destination: Pubkey,
    /// LP token mint.
    pub pool_token_mint: Pubkey,
    /// Pool fee account.
    pub pool_fee_account: Pubkey,
    /// Exact input amount.
    pub amount_in: u64,
    /// Lowest output accepted.
    pub minimum_amount_out: u64,
}

/// Two hops through a transit token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitiveSwapData {
    /// First hop, into the transit token.
    pub from: DirectSwapData,
    /// Second hop, out of the transit token.
    pub to: DirectSwapData,
    /// Mint of the transit token.
    pub transit_token_mint: Pubkey,
    /// Whether the user's transit token account must be created first.
    pub needs_create_transit_token_account: bool,
}

/// Resolved swap route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapData {
    /// One pool.
    Direct(DirectSwapData),
    /// Two pools through a transit token.
    Transitive(TransitiveSwapData),
}

impl SwapData {
    /// Amount taken from the user's source account.
    #[must_use]
    pub const fn amount_in(&self) -> u64 {
        match self {
            Self::Direct(swap) => swap.amount_in,
            Self::Transitive(swap) => swap.from.amount_in,
        }
    }

    /// Lowest amount accepted at the end of the route.
    #[must_use]
    pub const fn minimum_amount_out(&self) -> u64 {
        match self {
            Self::Direct(swap) => swap.minimum_amount_out,
            Self::Transitive(swap) => swap.to.minimum_amount_out,
        }
    }

    /// Account allowed to move the user's source tokens.
    #[must_use]
    pub const fn transfer_authority(&self) -> Pubkey {
        match self {
            Self::Direct(swap) => swap.transfer_authority,
            Self::Transitive(swap) => swap.from.transfer_authority,
        }
    }
}

/// Swap data together with the fresh transfer authority it names, if one was
/// created.
#[derive(Debug)]
pub struct SwapDataWithAuthority {
    /// The resolved route.
    pub swap_data: SwapData,
    /// Delegated authority keypair; `None` when the user signs the transfer.
    pub transfer_authority: Option<Keypair>,
}
