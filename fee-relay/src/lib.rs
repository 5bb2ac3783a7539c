#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the fee-relay compensation engine.
//!
//! A fee relay fronts Solana network fees for a user and is compensated in
//! another token. This crate holds the chain-agnostic vocabulary shared by
//! the engine: how fees are split into buckets, how the relay's free-usage
//! allowance is consumed, and how slippage is applied to integer amounts.
//!
//! # Modules
//!
//! - [`fee`] - [`FeeAmount`] buckets and non-native fee metadata
//! - [`usage`] - [`UsageStatus`] free-transaction allowance
//! - [`slippage`] - [`Slippage`] tolerance with floor/ceil application
//! - [`network`] - [`Network`] cluster identifiers
//! - [`error`] - [`FeeError`]

pub mod error;
pub mod fee;
pub mod network;
pub mod slippage;
pub mod usage;

pub use error::FeeError;
pub use fee::{FeeAmount, OtherFee};
pub use network::Network;
pub use slippage::Slippage;
pub use usage::UsageStatus;
