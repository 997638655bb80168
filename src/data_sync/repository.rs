use crate::errors::RepositoryError;
use crate::logic::graph::RouteHash;
use crate::logic::pools::{Pool, PoolId};
use crate::logic::types::{ArbitrageOpportunity, OpportunityStatus, PricePoint};
use crate::utils::constants::Chain;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Durable store of pool state, price history and detected opportunities.
///
/// Ingestion owns pools and prices, the detector owns opportunities.
#[async_trait]
pub trait PoolRepository: Send + Sync {
    /// `false` until the backing store is usable. Starting a service on a repository that is
    /// not ready is a fatal error.
    fn is_ready(&self) -> bool;

    async fn get_pools_by_chain(&self, chain: Chain) -> Result<Vec<Pool>, RepositoryError>;

    /// Active pools ordered by USD liquidity, deepest first.
    async fn get_top_liquidity_pools(&self, limit: usize) -> Result<Vec<Pool>, RepositoryError>;

    async fn get_active_pools(&self) -> Result<Vec<Pool>, RepositoryError>;

    /// Upsert keyed by pool id.
    async fn insert_pool(&self, pool: Pool) -> Result<(), RepositoryError>;

    /// Soft deactivation, pools are never deleted.
    async fn set_pool_active(&self, pool_id: &PoolId, is_active: bool) -> Result<(), RepositoryError>;

    /// Appends a price point. Returns `false` when the (pool, block) row already exists.
    async fn insert_price_point(&self, point: PricePoint) -> Result<bool, RepositoryError>;

    /// Most recent points first.
    async fn get_price_history(&self, pool_id: &PoolId, limit: usize) -> Result<Vec<PricePoint>, RepositoryError>;

    async fn insert_arbitrage_opportunity(&self, opportunity: ArbitrageOpportunity) -> Result<(), RepositoryError>;

    /// Viable opportunities whose profit after gas is at least `min_profit`, best first.
    async fn get_viable_arbitrage_opportunities(&self, min_profit: f64) -> Result<Vec<ArbitrageOpportunity>, RepositoryError>;

    async fn update_opportunity_status(&self, id: &RouteHash, status: OpportunityStatus) -> Result<(), RepositoryError>;
}

/// [`PoolRepository`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryPoolRepository {
    ready: AtomicBool,
    pools: DashMap<PoolId, Pool>,
    // pool -> block -> point
    prices: DashMap<PoolId, BTreeMap<u64, PricePoint>>,
    opportunities: DashMap<RouteHash, ArbitrageOpportunity>,
    // price writes for these pools fail, to exercise per-pool error handling
    failing_pools: DashSet<PoolId>,
}

impl InMemoryPoolRepository {
    pub fn new() -> Self {
        Self { ready: AtomicBool::new(true), ..Default::default() }
    }

    /// A repository that rejects every call until [`mark_ready`](Self::mark_ready).
    pub fn uninitialized() -> Self {
        Self::default()
    }

    pub fn with_pools<I: IntoIterator<Item = Pool>>(pools: I) -> Self {
        let repository = Self::new();
        for pool in pools {
            repository.pools.insert(pool.id.clone(), pool);
        }
        repository
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn fail_price_writes_for(&self, pool_id: PoolId) {
        self.failing_pools.insert(pool_id);
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn price_point_count(&self) -> usize {
        self.prices.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn opportunity_count(&self) -> usize {
        self.opportunities.len()
    }

    fn ensure_ready(&self) -> Result<(), RepositoryError> {
        if self.is_ready() { Ok(()) } else { Err(RepositoryError::NotInitialized) }
    }
}

#[async_trait]
impl PoolRepository for InMemoryPoolRepository {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn get_pools_by_chain(&self, chain: Chain) -> Result<Vec<Pool>, RepositoryError> {
        self.ensure_ready()?;
        let mut pools: Vec<Pool> = self.pools.iter().filter(|entry| entry.chain == chain).map(|entry| entry.value().clone()).collect();
        pools.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pools)
    }

    async fn get_top_liquidity_pools(&self, limit: usize) -> Result<Vec<Pool>, RepositoryError> {
        self.ensure_ready()?;
        let mut pools: Vec<Pool> = self.pools.iter().filter(|entry| entry.is_active).map(|entry| entry.value().clone()).collect();
        pools.sort_by(|a, b| b.liquidity_usd.total_cmp(&a.liquidity_usd).then_with(|| a.id.cmp(&b.id)));
        pools.truncate(limit);
        Ok(pools)
    }

    async fn get_active_pools(&self) -> Result<Vec<Pool>, RepositoryError> {
        self.ensure_ready()?;
        let mut pools: Vec<Pool> = self.pools.iter().filter(|entry| entry.is_active).map(|entry| entry.value().clone()).collect();
        pools.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pools)
    }

    async fn insert_pool(&self, pool: Pool) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        self.pools.insert(pool.id.clone(), pool);
        Ok(())
    }

    async fn set_pool_active(&self, pool_id: &PoolId, is_active: bool) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        let mut pool = self.pools.get_mut(pool_id).ok_or_else(|| RepositoryError::PoolNotFound(pool_id.clone()))?;
        pool.is_active = is_active;
        Ok(())
    }

    async fn insert_price_point(&self, point: PricePoint) -> Result<bool, RepositoryError> {
        self.ensure_ready()?;
        if self.failing_pools.contains(&point.pool_id) {
            return Err(RepositoryError::Storage(format!("price write rejected for pool {}", point.pool_id)));
        }
        let mut history = self.prices.entry(point.pool_id.clone()).or_default();
        if history.contains_key(&point.block_number) {
            debug!(pool_id = %point.pool_id, block = point.block_number, "Price point already recorded");
            return Ok(false);
        }
        history.insert(point.block_number, point);
        Ok(true)
    }

    async fn get_price_history(&self, pool_id: &PoolId, limit: usize) -> Result<Vec<PricePoint>, RepositoryError> {
        self.ensure_ready()?;
        Ok(self.prices.get(pool_id).map(|history| history.values().rev().take(limit).cloned().collect()).unwrap_or_default())
    }

    async fn insert_arbitrage_opportunity(&self, opportunity: ArbitrageOpportunity) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        self.opportunities.insert(opportunity.id.clone(), opportunity);
        Ok(())
    }

    async fn get_viable_arbitrage_opportunities(&self, min_profit: f64) -> Result<Vec<ArbitrageOpportunity>, RepositoryError> {
        self.ensure_ready()?;
        let mut opportunities: Vec<ArbitrageOpportunity> =
            self.opportunities.iter().filter(|entry| entry.viable && entry.net_profit() >= min_profit).map(|entry| entry.value().clone()).collect();
        opportunities.sort_by(|a, b| b.net_profit().total_cmp(&a.net_profit()).then_with(|| a.id.cmp(&b.id)));
        Ok(opportunities)
    }

    async fn update_opportunity_status(&self, id: &RouteHash, status: OpportunityStatus) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        let mut opportunity = self.opportunities.get_mut(id).ok_or_else(|| RepositoryError::OpportunityNotFound(id.to_string()))?;
        opportunity.status = status;
        Ok(())
    }
}
