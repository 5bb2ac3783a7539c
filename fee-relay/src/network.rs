//! Solana cluster identification.
//!
//! Clusters are identified CAIP-2 style by the first 32 characters of their
//! genesis hash, e.g. `solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp` for mainnet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// CAIP-2 namespace shared by all Solana clusters.
pub const SOLANA_NAMESPACE: &str = "solana";

/// A Solana cluster the relay operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// Production cluster.
    MainnetBeta,
    /// Developer cluster.
    Devnet,
    /// Validator test cluster.
    Testnet,
}

impl Network {
    /// All known clusters.
    pub const ALL: [Self; 3] = [Self::MainnetBeta, Self::Devnet, Self::Testnet];

    /// Human-readable cluster name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
        }
    }

    /// Genesis-hash reference of the cluster.
    #[must_use]
    pub const fn reference(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
            Self::Devnet => "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
            Self::Testnet => "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z",
        }
    }

    /// Looks up a cluster by name (`"mainnet-beta"`, `"devnet"`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.name() == name)
    }

    /// Looks up a cluster by genesis-hash reference.
    #[must_use]
    pub fn from_reference(reference: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.reference() == reference)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SOLANA_NAMESPACE}:{}", self.reference())
    }
}

/// Error returned when a network identifier cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("Unknown network {0}")]
pub struct NetworkFormatError(String);

impl FromStr for Network {
    type Err = NetworkFormatError;

    /// Accepts either a CAIP-2 identifier or a cluster name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.split_once(':') {
            Some((SOLANA_NAMESPACE, reference)) => Self::from_reference(reference),
            Some(_) => None,
            None => Self::from_name(s),
        };
        parsed.ok_or_else(|| NetworkFormatError(s.into()))
    }
}

impl Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
