use crate::utils::constants::Chain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// USD cost of one swap leg per chain.
///
/// These are fixed estimates, not derived from the observed gas price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasCostTable {
    pub swap_cost_usd: HashMap<Chain, f64>,
}

impl Default for GasCostTable {
    fn default() -> Self {
        Self { swap_cost_usd: Chain::iter().map(|chain| (chain, chain.default_swap_cost_usd())).collect() }
    }
}

impl GasCostTable {
    pub fn hop_cost_usd(&self, chain: Chain) -> f64 {
        self.swap_cost_usd.get(&chain).copied().unwrap_or_else(|| chain.default_swap_cost_usd())
    }

    /// Cost of executing a two-pool opportunity. Cross-chain pairs pay both legs.
    pub fn pair_cost_usd(&self, chain_a: Chain, chain_b: Chain) -> f64 {
        if chain_a == chain_b { self.hop_cost_usd(chain_a) } else { self.hop_cost_usd(chain_a) + self.hop_cost_usd(chain_b) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_chain_sums_both_legs() {
        let table = GasCostTable::default();
        let same = table.pair_cost_usd(Chain::Arbitrum, Chain::Arbitrum);
        let cross = table.pair_cost_usd(Chain::Arbitrum, Chain::Ethereum);

        assert_eq!(same, Chain::Arbitrum.default_swap_cost_usd());
        assert_eq!(cross, Chain::Arbitrum.default_swap_cost_usd() + Chain::Ethereum.default_swap_cost_usd());
        assert_eq!(cross, table.pair_cost_usd(Chain::Ethereum, Chain::Arbitrum));
    }

    #[test]
    fn test_partial_table_falls_back_to_defaults() -> eyre::Result<()> {
        let table: GasCostTable = toml::from_str("[swap_cost_usd]\nethereum = 12.5\n")?;
        assert_eq!(table.hop_cost_usd(Chain::Ethereum), 12.5);
        assert_eq!(table.hop_cost_usd(Chain::Base), Chain::Base.default_swap_cost_usd());
        Ok(())
    }
}
