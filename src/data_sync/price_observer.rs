use super::chain_client::{ChainClient, FeeData};
use super::config::ObserverConfig;
use super::repository::PoolRepository;
use crate::errors::ChainError;
use crate::logic::pools::{Pool, PoolId};
use crate::logic::types::{PricePoint, unix_now};
use crate::utils::cache::TtlCache;
use crate::utils::constants::Chain;
use eyre::eyre;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool id -> last observed `reserve1 / reserve0`.
pub type PriceCache = TtlCache<PoolId, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolOutcome {
    Priced,
    Cached,
    NoPrice,
    Duplicate,
    Failed,
}

/// Result of one observation cycle of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationReport {
    pub block_number: u64,
    pub sampled: usize,
    /// New price points written.
    pub priced: usize,
    /// Pools whose cached price was still fresh.
    pub cached: usize,
    /// Pools with a zero reserve.
    pub no_price: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Samples the deepest pools of one chain once per block.
pub struct PriceObserver {
    chain: Chain,
    client: Arc<dyn ChainClient>,
    repository: Arc<dyn PoolRepository>,
    price_cache: Arc<PriceCache>,
    top_pools: usize,
    rpc_timeout: Duration,
}

impl PriceObserver {
    pub fn new(client: Arc<dyn ChainClient>, repository: Arc<dyn PoolRepository>, price_cache: Arc<PriceCache>, config: &ObserverConfig) -> Self {
        Self { chain: client.chain(), client, repository, price_cache, top_pools: config.top_pools_per_chain, rpc_timeout: config.rpc_timeout() }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Runs one observation cycle. A failing block or gas query aborts the cycle, a failing
    /// pool is logged and skipped.
    pub async fn observe_once(&self) -> eyre::Result<ObservationReport> {
        let (block_number, fee_data) = tokio::try_join!(self.with_timeout(self.client.get_block_number()), self.with_timeout(self.client.get_fee_data()))
            .map_err(|e| eyre!("{} block/gas fetch failed: {}", self.chain, e))?;

        self.price_cache.cleanup_expired();

        let mut pools = self.repository.get_pools_by_chain(self.chain).await.map_err(|e| eyre!("{} pool query failed: {}", self.chain, e))?;
        pools.retain(|pool| pool.is_active);
        pools.sort_by(|a, b| b.liquidity_usd.total_cmp(&a.liquidity_usd).then_with(|| a.id.cmp(&b.id)));
        pools.truncate(self.top_pools);

        let outcomes = join_all(pools.iter().map(|pool| self.observe_pool(pool, block_number, &fee_data))).await;

        let mut report = ObservationReport { block_number, sampled: pools.len(), ..Default::default() };
        for outcome in outcomes {
            match outcome {
                PoolOutcome::Priced => report.priced += 1,
                PoolOutcome::Cached => report.cached += 1,
                PoolOutcome::NoPrice => report.no_price += 1,
                PoolOutcome::Duplicate => report.duplicates += 1,
                PoolOutcome::Failed => report.failed += 1,
            }
        }

        info!(chain = %self.chain, block = block_number, sampled = report.sampled, priced = report.priced, cached = report.cached, failed = report.failed, "Price observation finished");
        Ok(report)
    }

    async fn with_timeout<T>(&self, call: impl Future<Output = Result<T, ChainError>>) -> Result<T, ChainError> {
        tokio::time::timeout(self.rpc_timeout, call).await.map_err(|_| ChainError::Timeout)?
    }

    async fn observe_pool(&self, pool: &Pool, block_number: u64, fee_data: &FeeData) -> PoolOutcome {
        if self.price_cache.contains_fresh(&pool.id) {
            return PoolOutcome::Cached;
        }

        let Some(price) = pool.price() else {
            debug!(pool_id = %pool.id, "Pool has a zero reserve, no price");
            return PoolOutcome::NoPrice;
        };
        self.price_cache.insert(pool.id.clone(), price);

        let point = PricePoint {
            pool_id: pool.id.clone(),
            chain: self.chain,
            price,
            reserve0: pool.reserve0,
            reserve1: pool.reserve1,
            block_number,
            timestamp: unix_now(),
            gas_price: fee_data.gas_price,
        };

        match self.repository.insert_price_point(point).await {
            Ok(true) => PoolOutcome::Priced,
            Ok(false) => PoolOutcome::Duplicate,
            Err(e) => {
                warn!(pool_id = %pool.id, chain = %self.chain, "Failed to store price point: {}", e);
                PoolOutcome::Failed
            }
        }
    }
}
