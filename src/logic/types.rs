use super::graph::RouteHash;
use super::pools::{Pool, PoolId};
use crate::utils::constants::{Chain, MAX_SEARCH_ITERATIONS};
use crate::utils::token::normalize_symbol;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use strum_macros::{Display, EnumIter, EnumString};

/// Immutable price observation, one per (pool, block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub pool_id: PoolId,
    pub chain: Chain,
    /// `reserve1 / reserve0`
    pub price: f64,
    pub reserve0: f64,
    pub reserve1: f64,
    pub block_number: u64,
    /// Unix seconds
    pub timestamp: u64,
    /// Gas price in wei at observation time.
    pub gas_price: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    #[default]
    Detected,
    Executing,
    Executed,
    Failed,
    Expired,
}

/// Two-pool price spread emitted by the opportunity detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub id: RouteHash,
    pub pool_a: PoolId,
    pub pool_b: PoolId,
    pub chain_a: Chain,
    pub chain_b: Chain,
    /// Normalized pair key, e.g. `ETH/USDC`
    pub token_pair: String,
    pub price_a: f64,
    pub price_b: f64,
    /// `|price_a - price_b| / min(price_a, price_b)`
    pub price_delta: f64,
    pub profit_estimate: f64,
    pub gas_estimate: f64,
    /// Trade size in USD the estimate assumes.
    pub liquidity_required: f64,
    pub viable: bool,
    pub cross_chain: bool,
    /// Unix seconds
    pub detected_at: u64,
    pub status: OpportunityStatus,
}

impl ArbitrageOpportunity {
    pub fn net_profit(&self) -> f64 {
        self.profit_estimate - self.gas_estimate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionComplexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    Direct,
    MultiHop,
    CrossChain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub pool_id: PoolId,
    pub chain: Chain,
    pub dex: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub price_impact: f64,
    /// USD
    pub gas_estimate: f64,
}

/// Ranked arbitrage cycle. Only lives in the route cache and in query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageRoute {
    pub id: RouteHash,
    pub strategy: RouteStrategy,
    pub steps: Vec<RouteStep>,
    pub total_gas_estimate: f64,
    /// Net USD profit after gas.
    pub estimated_profit: f64,
    /// Net profit relative to the USD value of the input.
    pub profit_margin: f64,
    pub risk_score: f64,
    pub liquidity_utilization: f64,
    pub execution_complexity: ExecutionComplexity,
    pub flash_loan_required: bool,
    pub cross_chain: bool,
    pub viability_score: f64,
}

impl ArbitrageRoute {
    pub fn hop_count(&self) -> usize {
        self.steps.len()
    }

    pub fn total_price_impact(&self) -> f64 {
        self.steps.iter().map(|step| step.price_impact).sum()
    }

    pub fn amount_in(&self) -> f64 {
        self.steps.first().map(|step| step.amount_in).unwrap_or_default()
    }

    pub fn amount_out(&self) -> f64 {
        self.steps.last().map(|step| step.amount_out).unwrap_or_default()
    }

    pub fn start_token(&self) -> Option<&str> {
        self.steps.first().map(|step| step.token_in.as_str())
    }

    /// Every step feeds the next one and the route ends in the token it started with.
    pub fn is_closed_cycle(&self) -> bool {
        let chained = self.steps.windows(2).all(|pair| pair[0].amount_out == pair[1].amount_in && pair[0].token_out == pair[1].token_in);
        match (self.steps.first(), self.steps.last()) {
            (Some(first), Some(last)) => chained && first.token_in == last.token_out,
            _ => false,
        }
    }
}

/// Limits a route must satisfy to be returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConstraints {
    pub max_hops: usize,
    /// USD
    pub min_profit: f64,
    /// USD, summed over all steps
    pub max_gas_cost: f64,
    /// 0..=1
    pub max_liquidity_utilization: f64,
    pub allow_cross_chain: bool,
    /// Empty means every chain.
    pub preferred_chains: Vec<Chain>,
    pub excluded_tokens: Vec<String>,
    /// Bound on the summed price impact of all steps.
    pub max_price_impact: f64,
}

impl Default for RouteConstraints {
    fn default() -> Self {
        Self {
            max_hops: 4,
            min_profit: 10.0,
            max_gas_cost: 100.0,
            max_liquidity_utilization: 0.1,
            allow_cross_chain: false,
            preferred_chains: Vec::new(),
            excluded_tokens: Vec::new(),
            max_price_impact: 0.05,
        }
    }
}

impl RouteConstraints {
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_min_profit(mut self, min_profit: f64) -> Self {
        self.min_profit = min_profit;
        self
    }

    pub fn with_max_gas_cost(mut self, max_gas_cost: f64) -> Self {
        self.max_gas_cost = max_gas_cost;
        self
    }

    pub fn with_max_liquidity_utilization(mut self, max_liquidity_utilization: f64) -> Self {
        self.max_liquidity_utilization = max_liquidity_utilization;
        self
    }

    pub fn with_cross_chain(mut self, allow_cross_chain: bool) -> Self {
        self.allow_cross_chain = allow_cross_chain;
        self
    }

    pub fn with_preferred_chains(mut self, chains: Vec<Chain>) -> Self {
        self.preferred_chains = chains;
        self
    }

    pub fn with_excluded_tokens(mut self, tokens: Vec<String>) -> Self {
        self.excluded_tokens = tokens.iter().map(|token| normalize_symbol(token)).collect();
        self
    }

    pub fn with_max_price_impact(mut self, max_price_impact: f64) -> Self {
        self.max_price_impact = max_price_impact;
        self
    }

    pub fn is_token_excluded(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        self.excluded_tokens.iter().any(|excluded| normalize_symbol(excluded) == symbol)
    }

    /// Chain and token filters applied to every hop candidate.
    pub fn allows_pool(&self, pool: &Pool) -> bool {
        if !self.preferred_chains.is_empty() && !self.preferred_chains.contains(&pool.chain) {
            return false;
        }
        let (symbol0, symbol1) = pool.symbols();
        !self.is_token_excluded(symbol0) && !self.is_token_excluded(symbol1)
    }

    /// Stable string form used in route cache keys.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Settings of the pairwise opportunity detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub interval_ms: u64,
    /// Number of liquidity-ranked pools loaded per detection pass.
    pub top_k: usize,
    pub min_price_delta: f64,
    /// Minimum profit left after gas, USD.
    pub min_profit_usd: f64,
    pub slippage_factor: f64,
    /// Share of the shallower pool's USD liquidity traded.
    pub trade_size_fraction: f64,
    pub max_trade_size_usd: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            top_k: 500,
            min_price_delta: 0.005,
            min_profit_usd: 50.0,
            slippage_factor: 0.8,
            trade_size_fraction: 0.01,
            max_trade_size_usd: 100_000.0,
        }
    }
}

impl DetectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Settings of the multi-hop route finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSearchConfig {
    pub route_cache_ttl_secs: u64,
    /// Trade size used by the top-opportunity sweep, USD.
    pub default_trade_usd: f64,
    pub flash_loan_threshold_usd: f64,
    pub max_search_iterations: usize,
    pub enable_parallel_calculation: bool,
    pub default_constraints: RouteConstraints,
}

impl Default for RouteSearchConfig {
    fn default() -> Self {
        Self {
            route_cache_ttl_secs: 30,
            default_trade_usd: 1_000.0,
            flash_loan_threshold_usd: 10_000.0,
            max_search_iterations: MAX_SEARCH_ITERATIONS,
            enable_parallel_calculation: true,
            default_constraints: RouteConstraints::default(),
        }
    }
}

impl RouteSearchConfig {
    pub fn route_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.route_cache_ttl_secs)
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::MockPoolBuilder;

    #[test]
    fn test_constraint_filters() {
        let constraints = RouteConstraints::default()
            .with_preferred_chains(vec![Chain::Arbitrum])
            .with_excluded_tokens(vec!["dai".to_string()]);

        let arbitrum = MockPoolBuilder::new("p1", "ETH", "USDC").chain(Chain::Arbitrum).build();
        let mainnet = MockPoolBuilder::new("p2", "ETH", "USDC").build();
        let with_dai = MockPoolBuilder::new("p3", "DAI", "USDC").chain(Chain::Arbitrum).build();

        assert!(constraints.allows_pool(&arbitrum));
        assert!(!constraints.allows_pool(&mainnet));
        assert!(!constraints.allows_pool(&with_dai));
        assert!(constraints.is_token_excluded(" Dai "));
    }

    #[test]
    fn test_constraints_cache_key_differs() {
        let a = RouteConstraints::default();
        let b = RouteConstraints::default().with_min_profit(11.0);
        assert_eq!(a.cache_key(), RouteConstraints::default().cache_key());
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(OpportunityStatus::default().to_string(), "detected");
        assert_eq!(ExecutionComplexity::Medium.to_string(), "medium");
        assert_eq!(RouteStrategy::MultiHop.to_string(), "multi_hop");
    }

    #[test]
    fn test_partial_detector_config() -> eyre::Result<()> {
        let config: DetectorConfig = toml::from_str("min_price_delta = 0.01")?;
        assert_eq!(config.min_price_delta, 0.01);
        assert_eq!(config.top_k, 500);
        assert_eq!(config.interval(), Duration::from_secs(5));
        Ok(())
    }
}
