//! Configuration for relay compensation.
//!
//! Every field has a default matching the relay's production settings, so an
//! empty JSON object is a valid configuration.

use fee_relay::Slippage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum serialized size of a Solana transaction in bytes.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Settings for the fee calculator and the transaction builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationConfig {
    /// Slippage applied when converting a SOL fee into the paying token.
    /// Default: 0.01
    #[serde(default = "default_top_up_slippage")]
    pub top_up_slippage: Slippage,

    /// Smallest top-up the relay accepts, in lamports. A non-zero top-up
    /// below this is raised to it.
    /// Default: 1000
    #[serde(default = "default_minimum_top_up_lamports")]
    pub minimum_top_up_lamports: u64,

    /// Signatures carried by a top-up transaction (user and fee payer).
    /// Default: 2
    #[serde(default = "default_top_up_signatures")]
    pub top_up_signatures: u64,

    /// Serialized size above which the pipeline moves account creation into
    /// a separate transaction.
    /// Default: 1232
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,
}

fn default_top_up_slippage() -> Slippage {
    Slippage::new(Decimal::new(1, 2)).unwrap_or_default()
}

const fn default_minimum_top_up_lamports() -> u64 {
    1000
}

const fn default_top_up_signatures() -> u64 {
    2
}

const fn default_max_transaction_size() -> usize {
    PACKET_DATA_SIZE
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            top_up_slippage: default_top_up_slippage(),
            minimum_top_up_lamports: default_minimum_top_up_lamports(),
            top_up_signatures: default_top_up_signatures(),
            max_transaction_size: default_max_transaction_size(),
        }
    }
}

impl CompensationConfig {
    /// Reads a configuration from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the value does not match the schema
    /// or the slippage is outside `[0, 1)`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Reads a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the string is not valid JSON for the
    /// schema.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
