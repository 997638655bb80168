use super::gas::GasCostTable;
use super::graph::RouteHash;
use super::pools::{Pool, PoolId};
use super::types::{ArbitrageOpportunity, DetectorConfig, OpportunityStatus, unix_now};
use crate::data_sync::price_observer::PriceCache;
use crate::data_sync::repository::PoolRepository;
use eyre::eyre;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Outcome of comparing two pools quoting the same pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEvaluation {
    pub price_delta: f64,
    pub trade_size_usd: f64,
    pub profit_estimate: f64,
    pub gas_estimate: f64,
    pub viable: bool,
}

/// `|a - b| / min(a, b)`, `None` unless both prices are positive and finite.
pub fn price_delta(price_a: f64, price_b: f64) -> Option<f64> {
    let valid = |price: f64| price.is_finite() && price > 0.0;
    if !valid(price_a) || !valid(price_b) {
        return None;
    }
    Some((price_a - price_b).abs() / price_a.min(price_b))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReport {
    pub pools_scanned: usize,
    pub pairs_evaluated: usize,
    /// Pools skipped because the price cache had no fresh entry.
    pub missing_prices: usize,
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub write_failures: usize,
}

/// Finds two-pool spreads among pools that quote the same token pair.
#[derive(Debug, Clone, Default)]
pub struct OpportunityDetector {
    config: DetectorConfig,
    gas_table: GasCostTable,
}

impl OpportunityDetector {
    pub fn new(config: DetectorConfig, gas_table: GasCostTable) -> Self {
        Self { config, gas_table }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Compares two pools given their prices in pair order. Returns `None` when the spread does
    /// not exceed the configured minimum. Symmetric in its two (pool, price) arguments.
    pub fn evaluate_pair(&self, pool_a: &Pool, price_a: f64, pool_b: &Pool, price_b: f64) -> Option<PairEvaluation> {
        let price_delta = price_delta(price_a, price_b)?;
        if price_delta <= self.config.min_price_delta {
            return None;
        }

        let shallower_liquidity = pool_a.liquidity_usd.min(pool_b.liquidity_usd).max(0.0);
        let trade_size_usd = (shallower_liquidity * self.config.trade_size_fraction).min(self.config.max_trade_size_usd);
        let profit_estimate = trade_size_usd * price_delta * self.config.slippage_factor;
        let gas_estimate = self.gas_table.pair_cost_usd(pool_a.chain, pool_b.chain);
        let viable = profit_estimate - gas_estimate > self.config.min_profit_usd;

        Some(PairEvaluation { price_delta, trade_size_usd, profit_estimate, gas_estimate, viable })
    }

    fn build_opportunity(pool_a: &Pool, price_a: f64, pool_b: &Pool, price_b: f64, evaluation: &PairEvaluation, detected_at: u64) -> ArbitrageOpportunity {
        let detected_at_str = detected_at.to_string();
        ArbitrageOpportunity {
            id: RouteHash::from_parts([pool_a.id.as_str(), pool_b.id.as_str(), detected_at_str.as_str()]),
            pool_a: pool_a.id.clone(),
            pool_b: pool_b.id.clone(),
            chain_a: pool_a.chain,
            chain_b: pool_b.chain,
            token_pair: pool_a.pair_key(),
            price_a,
            price_b,
            price_delta: evaluation.price_delta,
            profit_estimate: evaluation.profit_estimate,
            gas_estimate: evaluation.gas_estimate,
            liquidity_required: evaluation.trade_size_usd,
            viable: evaluation.viable,
            cross_chain: pool_a.chain != pool_b.chain,
            detected_at,
            status: OpportunityStatus::Detected,
        }
    }

    /// Groups `pools` by pair key and evaluates every unordered pool pair inside a group.
    /// `price_of` returns the raw `reserve1 / reserve0` price of a pool, pools without one are
    /// skipped.
    pub fn scan<F>(&self, pools: &[Pool], price_of: F, detected_at: u64) -> DetectionReport
    where
        F: Fn(&PoolId) -> Option<f64>,
    {
        let mut report = DetectionReport { pools_scanned: pools.len(), ..Default::default() };

        let mut groups: BTreeMap<String, Vec<(&Pool, f64)>> = BTreeMap::new();
        for pool in pools.iter().filter(|pool| pool.is_active) {
            let Some(raw_price) = price_of(&pool.id) else {
                report.missing_prices += 1;
                continue;
            };
            groups.entry(pool.pair_key()).or_default().push((pool, pool.orient_price(raw_price)));
        }

        for (pair, group) in &groups {
            for (i, (pool_a, price_a)) in group.iter().enumerate() {
                for (pool_b, price_b) in &group[i + 1..] {
                    report.pairs_evaluated += 1;
                    let Some(evaluation) = self.evaluate_pair(pool_a, *price_a, pool_b, *price_b) else {
                        continue;
                    };
                    if !evaluation.viable {
                        debug!(pair = %pair, pool_a = %pool_a.id, pool_b = %pool_b.id, profit = evaluation.profit_estimate, gas = evaluation.gas_estimate, "Spread not viable");
                        continue;
                    }
                    report.opportunities.push(Self::build_opportunity(pool_a, *price_a, pool_b, *price_b, &evaluation, detected_at));
                }
            }
        }

        report
    }

    /// One detection pass: loads the top pools, prices them from the cache only and writes
    /// every viable opportunity to the repository.
    pub async fn detect(&self, repository: &dyn PoolRepository, price_cache: &PriceCache) -> eyre::Result<DetectionReport> {
        let pools = repository.get_top_liquidity_pools(self.config.top_k).await.map_err(|e| eyre!("failed to load pools for detection: {}", e))?;

        let mut report = self.scan(&pools, |pool_id| price_cache.get(pool_id), unix_now());

        for opportunity in &report.opportunities {
            if let Err(e) = repository.insert_arbitrage_opportunity(opportunity.clone()).await {
                warn!(id = %opportunity.id, "Failed to store opportunity: {}", e);
                report.write_failures += 1;
            }
        }

        info!(
            pools = report.pools_scanned,
            pairs = report.pairs_evaluated,
            missing_prices = report.missing_prices,
            opportunities = report.opportunities.len(),
            "Opportunity detection finished"
        );
        Ok(report)
    }
}
