use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// Address format family a chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    /// `0x` + 40 hex characters.
    Evm,
    /// Ripple-style ledger: 25..=35 characters starting with `r`.
    Ledger,
}

/// A supported blockchain network.
///
/// The set is closed; anything else coming from the outside world is
/// rejected with [`CoreError::UnsupportedChain`] or, in the normalizer,
/// replaced by the default chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Arbitrum,
    Optimism,
    Aptos,
    Avalanche,
    Base,
    Kaia,
    Polygon,
    Xrpl,
}

impl Chain {
    /// Every supported chain, in allow-list order. The first entry is the
    /// primary network.
    pub const ALL: [Chain; 9] = [
        Chain::Ethereum,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Aptos,
        Chain::Avalanche,
        Chain::Base,
        Chain::Kaia,
        Chain::Polygon,
        Chain::Xrpl,
    ];

    pub const PRIMARY: Chain = Chain::Ethereum;

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Aptos => "aptos",
            Chain::Avalanche => "avalanche",
            Chain::Base => "base",
            Chain::Kaia => "kaia",
            Chain::Polygon => "polygon",
            Chain::Xrpl => "xrpl",
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Xrpl => ChainFamily::Ledger,
            _ => ChainFamily::Evm,
        }
    }

    /// Chains of a given family, in allow-list order.
    pub fn of_family(family: ChainFamily) -> Vec<Chain> {
        Chain::ALL
            .iter()
            .copied()
            .filter(|c| c.family() == family)
            .collect()
    }

    /// Names of every supported chain, for error messages.
    pub fn supported_names() -> Vec<String> {
        Chain::ALL.iter().map(|c| c.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = CoreError;

    /// Exact, lowercase match against the allow-list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnsupportedChain {
                chain: s.to_string(),
                supported: Chain::supported_names(),
            })
    }
}
