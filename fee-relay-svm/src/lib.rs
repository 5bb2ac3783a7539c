#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana fee-relay compensation.
//!
//! Lets a user pay Solana network fees in any SPL token. A relay fronts the
//! fees and is compensated by swapping the user's token into SOL through
//! constant-product AMM pools, directly or through one transit token.
//!
//! # Architecture
//!
//! - [`calculator`] - top-up amounts, top-up fees, fee conversion into the paying token
//! - [`pool`] - AMM pool math and the route service trait
//! - [`swap`] - swap route data and the relay swap transaction pipeline
//! - [`topup`] - relay account top-up transaction
//! - [`program`] - relay, system and associated token account instructions
//! - [`context`] - per-operation snapshot of relay and chain state
//! - [`chain`] - chain state and relay service traits
//! - [`config`] - [`CompensationConfig`]
//! - [`transaction`] - compiled transactions awaiting signatures
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` events at fee decisions and pipeline steps
//!
//! # Usage
//!
//! ```ignore
//! use fee_relay_svm::{CompensationContext, FeeCalculator};
//!
//! let context = CompensationContext::load(&chain, &relay, &user).await?;
//! let calculator = FeeCalculator::default();
//! let needed = calculator.calculate_needed_top_up_amount(&context, &expected_fee, &paying_mint)?;
//! let in_token = calculator
//!     .calculate_fee_in_paying_token(&routes, needed, &paying_mint)
//!     .await?;
//! ```

pub mod calculator;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod pool;
pub mod program;
pub mod swap;
pub mod topup;
pub mod transaction;

pub use calculator::FeeCalculator;
pub use chain::{ChainStateClient, RelayServiceClient, TokenAccount, TokenAccountInfo};
pub use config::CompensationConfig;
pub use context::{CompensationContext, RelayAccountStatus};
pub use error::FeeRelayerError;
pub use pool::{Pool, PoolsPair, SwapRouteService};
pub use swap::{
    BuildConfig, BuildContext, BuildEnv, SwapData, SwapDataWithAuthority, SwapPipeline,
    build_swap_data,
};
pub use topup::{TopUpRequest, prepare_top_up};
pub use transaction::PreparedTransaction;
