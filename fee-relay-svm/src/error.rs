//! Error types for fee-relay compensation on Solana.
//!
//! This module centralizes the error types used by the fee calculator, the
//! swap route data builder and the transaction build pipeline. None of them
//! are retried inside the engine: the caller is expected to re-fetch a fresh
//! compensation context and start over.

use fee_relay::FeeError;
use solana_pubkey::Pubkey;

use crate::chain::{ChainClientError, RelayServiceError};
use crate::pool::RouteServiceError;

/// Errors produced while computing relay compensation or building relay
/// transactions.
#[derive(Debug, thiserror::Error)]
pub enum FeeRelayerError {
    /// No AMM route exists for the requested conversion.
    #[error("Swap pools not found")]
    SwapPoolsNotFound,
    /// Neither side of a swap amount could be resolved, or a resolved amount
    /// is not a positive quantity.
    #[error("Invalid amount")]
    InvalidAmount,
    /// A two-hop route was selected without a usable transit token.
    #[error("Transit token mint not found")]
    TransitTokenMintNotFound,
    /// Swap data does not match the pipeline state. This is a defect in the
    /// caller, not a user-facing condition.
    #[error("Unsupported swap shape: {0}")]
    UnsupportedSwapShape(&'static str),
    /// A checked lamport or token computation overflowed.
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    /// Slippage outside `[0, 1)` or otherwise invalid.
    #[error("Invalid slippage: {0}")]
    InvalidSlippage(String),
    /// A token program instruction could not be built.
    #[error("Can not build instruction: {0}")]
    Instruction(String),
    /// The transaction message could not be compiled.
    #[error("Can not compile transaction: {0}")]
    TransactionCompile(String),
    /// A signer is not among the transaction's required signers.
    #[error("Signer {0} not found in required signers")]
    SignerNotRequired(Pubkey),
    /// Signing failed.
    #[error("Can not sign transaction: {0}")]
    TransactionSign(String),
    /// Chain state request failed.
    #[error(transparent)]
    Client(#[from] ChainClientError),
    /// AMM route service request failed.
    #[error(transparent)]
    Route(#[from] RouteServiceError),
    /// Relay service request failed.
    #[error(transparent)]
    Relay(#[from] RelayServiceError),
}

impl From<FeeError> for FeeRelayerError {
    fn from(e: FeeError) -> Self {
        match e {
            FeeError::Overflow => Self::ArithmeticOverflow,
            FeeError::InvalidSlippage(_) | FeeError::InvalidSlippageFormat(_) => {
                Self::InvalidSlippage(e.to_string())
            }
        }
    }
}

/// Error encoding a transaction to base64.
#[derive(Debug, thiserror::Error)]
#[error("Can not encode transaction to base64: {0}")]
pub struct TransactionToB64Error(pub String);
