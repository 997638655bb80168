use crate::logic::gas::GasCostTable;
use crate::logic::types::{DetectorConfig, RouteSearchConfig};
use crate::utils::config_loader::{ConfigLoader, ConfigLoaderSync, LoadConfigError, load_from_file, load_from_file_sync};
use crate::utils::constants::Chain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use strum::IntoEnumIterator;

/// Settings of the per-chain price observation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Chains to observe. Each gets its own timer.
    pub chains: Vec<Chain>,
    pub top_pools_per_chain: usize,
    pub price_cache_ttl_ms: u64,
    /// Replaces the built-in block time of a chain as the observation cadence.
    pub block_time_overrides_ms: HashMap<Chain, u64>,
    /// Upper bound on a single block number or fee data call.
    pub rpc_timeout_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self { chains: Chain::iter().collect(), top_pools_per_chain: 50, price_cache_ttl_ms: 5_000, block_time_overrides_ms: HashMap::new(), rpc_timeout_ms: 5_000 }
    }
}

impl ObserverConfig {
    pub fn block_interval(&self, chain: Chain) -> Duration {
        self.block_time_overrides_ms.get(&chain).map(|ms| Duration::from_millis(*ms)).unwrap_or_else(|| chain.block_time())
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.price_cache_ttl_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

/// Root configuration, one TOML section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    pub observer: ObserverConfig,
    pub detector: DetectorConfig,
    pub route_search: RouteSearchConfig,
    pub gas: GasCostTable,
}

#[async_trait]
impl ConfigLoader for ArbitrageConfig {
    type SectionType = ArbitrageConfig;

    async fn load_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        load_from_file(file_name).await
    }
}

impl ConfigLoaderSync for ArbitrageConfig {
    type SectionType = ArbitrageConfig;

    fn load_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        load_from_file_sync(file_name)
    }
}
