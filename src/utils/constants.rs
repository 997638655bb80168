use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// Fee tiers are expressed in parts per million (3000 = 0.3%).
pub const FEE_DENOMINATOR_PPM: f64 = 1_000_000.0;

/// Separator used when joining the two symbols of a pair key, e.g. `ETH/USDC`.
pub const PAIR_KEY_SEPARATOR: &str = "/";

/// Sanity limit for the explicit-stack cycle search.
pub const MAX_SEARCH_ITERATIONS: usize = 500_000;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, VariantNames, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Arbitrum,
    Polygon,
    Optimism,
    Base,
    Bsc,
}

impl Chain {
    /// Average block interval, used as the price observation cadence.
    pub fn block_time(&self) -> Duration {
        match self {
            Chain::Ethereum => Duration::from_secs(12),
            Chain::Arbitrum => Duration::from_secs(1),
            Chain::Polygon => Duration::from_secs(2),
            Chain::Optimism => Duration::from_secs(2),
            Chain::Base => Duration::from_secs(2),
            Chain::Bsc => Duration::from_secs(3),
        }
    }

    /// Default USD cost of a single swap leg on this chain.
    pub fn default_swap_cost_usd(&self) -> f64 {
        match self {
            Chain::Ethereum => 50.0,
            Chain::Arbitrum => 1.0,
            Chain::Polygon => 0.2,
            Chain::Optimism => 0.5,
            Chain::Base => 0.5,
            Chain::Bsc => 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_chain_round_trip() {
        for chain in Chain::iter() {
            assert_eq!(Chain::from_str(&chain.to_string()).unwrap(), chain);
        }
        assert_eq!(Chain::from_str("Ethereum").unwrap(), Chain::Ethereum);
        assert_eq!(format!("{}", Chain::Bsc), "bsc");
    }

    #[test]
    fn test_block_times_are_positive() {
        assert!(Chain::iter().all(|chain| !chain.block_time().is_zero()));
    }
}
