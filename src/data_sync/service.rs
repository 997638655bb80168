use super::chain_client::ChainClient;
use super::config::ArbitrageConfig;
use super::price_observer::{PriceCache, PriceObserver};
use super::repository::PoolRepository;
use super::scheduler::{ScheduledTask, TaskStatsSnapshot};
use crate::errors::RepositoryError;
use crate::logic::opportunity_detector::OpportunityDetector;
use crate::logic::pools::Pool;
use crate::logic::route_search::{ArbitrageRouteFinder, RouteFinderStats};
use crate::logic::types::{ArbitrageOpportunity, ArbitrageRoute, RouteConstraints};
use crate::utils::config_loader::ConfigLoader;
use eyre::{Result, eyre};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub tasks: Vec<(String, TaskStatsSnapshot)>,
    pub price_cache_entries: usize,
    pub price_cache_hit_rate: f64,
    pub route_finder: RouteFinderStats,
}

/// Runs the price observers and the opportunity detector on their timers and serves route
/// queries from the route finder.
pub struct ArbitrageService {
    config: ArbitrageConfig,
    repository: Arc<dyn PoolRepository>,
    chain_clients: Vec<Arc<dyn ChainClient>>,
    price_cache: Arc<PriceCache>,
    detector: Arc<OpportunityDetector>,
    /// Swapped wholesale on every pool update, queries run on a cloned snapshot.
    route_finder: RwLock<Arc<ArbitrageRouteFinder>>,
    tasks: Vec<ScheduledTask>,
}

impl ArbitrageService {
    pub fn new(config: ArbitrageConfig, repository: Arc<dyn PoolRepository>, chain_clients: Vec<Arc<dyn ChainClient>>) -> Self {
        let price_cache = Arc::new(PriceCache::new(config.observer.price_cache_ttl()));
        let detector = Arc::new(OpportunityDetector::new(config.detector.clone(), config.gas.clone()));
        let route_finder = RwLock::new(Arc::new(ArbitrageRouteFinder::new(config.route_search.clone(), config.gas.clone())));

        Self { config, repository, chain_clients, price_cache, detector, route_finder, tasks: Vec::new() }
    }

    /// Loads the pool graph and starts one price task per configured chain plus the detector task.
    /// Fails immediately if the repository is not ready.
    pub async fn start(&mut self) -> Result<()> {
        if !self.repository.is_ready() {
            return Err(eyre!("cannot start arbitrage service: {}", RepositoryError::NotInitialized));
        }
        if !self.tasks.is_empty() {
            return Err(eyre!("arbitrage service already started"));
        }
        info!("Starting ArbitrageService");

        let pool_count = self.refresh_pools().await?;
        info!(pools = pool_count, "Initial pool graph loaded");

        for client in &self.chain_clients {
            let chain = client.chain();
            if !self.config.observer.chains.contains(&chain) {
                warn!(%chain, "Chain client provided for a chain that is not configured, skipping");
                continue;
            }

            let observer = Arc::new(PriceObserver::new(client.clone(), self.repository.clone(), self.price_cache.clone(), &self.config.observer));
            let task = ScheduledTask::spawn(format!("price-observer-{chain}"), self.config.observer.block_interval(chain), move || {
                let observer = observer.clone();
                async move { observer.observe_once().await.map(|_| ()) }.boxed()
            });
            self.tasks.push(task);
        }

        let detector = self.detector.clone();
        let repository = self.repository.clone();
        let price_cache = self.price_cache.clone();
        let task = ScheduledTask::spawn("opportunity-detector", self.config.detector.interval(), move || {
            let detector = detector.clone();
            let repository = repository.clone();
            let price_cache = price_cache.clone();
            async move { detector.detect(repository.as_ref(), &price_cache).await.map(|_| ()) }.boxed()
        });
        self.tasks.push(task);

        info!(tasks = self.tasks.len(), "ArbitrageService started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping ArbitrageService");
        for mut task in self.tasks.drain(..) {
            task.stop().await;
        }
        info!("ArbitrageService stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| task.is_running())
    }

    /// Rebuilds the token graph from the repository's active pools. Returns the number of pools read.
    pub async fn refresh_pools(&self) -> Result<usize> {
        let pools = self.repository.get_active_pools().await.map_err(|e| eyre!("failed to load active pools: {}", e))?;
        let count = pools.len();
        self.update_pools(pools).await;
        Ok(count)
    }

    /// Replaces the pool set used for route search. The new finder starts with an empty route
    /// cache; searches already running finish on the previous snapshot.
    pub async fn update_pools(&self, pools: Vec<Pool>) {
        let mut route_finder = self.route_finder.write().await;
        let rebuilt = route_finder.rebuilt(pools);
        *route_finder = Arc::new(rebuilt);
    }

    /// Runs the search on the blocking pool so timer tasks keep their worker threads.
    pub async fn find_arbitrage_routes(&self, token_a: &str, token_b: &str, amount_in: f64, constraints: &RouteConstraints) -> Vec<ArbitrageRoute> {
        let finder = self.route_finder().await;
        let (token_a, token_b, constraints) = (token_a.to_string(), token_b.to_string(), constraints.clone());
        match tokio::task::spawn_blocking(move || finder.find_arbitrage_routes(&token_a, &token_b, amount_in, &constraints)).await {
            Ok(routes) => routes,
            Err(e) => {
                error!("Route search task failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_top_opportunities(&self, limit: usize) -> Vec<ArbitrageRoute> {
        let finder = self.route_finder().await;
        match tokio::task::spawn_blocking(move || finder.get_top_opportunities(limit)).await {
            Ok(routes) => routes,
            Err(e) => {
                error!("Top opportunity sweep failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Two-pool opportunities written by the detector.
    pub async fn get_viable_opportunities(&self, min_profit: f64) -> Result<Vec<ArbitrageOpportunity>> {
        self.repository.get_viable_arbitrage_opportunities(min_profit).await.map_err(|e| eyre!("failed to load opportunities: {}", e))
    }

    /// Current route finder snapshot.
    pub async fn route_finder(&self) -> Arc<ArbitrageRouteFinder> {
        self.route_finder.read().await.clone()
    }

    pub fn price_cache(&self) -> Arc<PriceCache> {
        self.price_cache.clone()
    }

    pub fn get_config(&self) -> &ArbitrageConfig {
        &self.config
    }

    pub async fn stats(&self) -> ServiceStats {
        ServiceStats {
            tasks: self.tasks.iter().map(|task| (task.name().to_string(), task.stats())).collect(),
            price_cache_entries: self.price_cache.len(),
            price_cache_hit_rate: self.price_cache.stats.hit_rate(),
            route_finder: self.route_finder().await.stats(),
        }
    }
}

impl Drop for ArbitrageService {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ArbitrageService dropped while running, tasks will be aborted");
        }
    }
}

/// Builder for ArbitrageService to make creation more ergonomic
pub struct ArbitrageServiceBuilder {
    config: Option<ArbitrageConfig>,
    repository: Option<Arc<dyn PoolRepository>>,
    chain_clients: Vec<Arc<dyn ChainClient>>,
}

impl ArbitrageServiceBuilder {
    pub fn new() -> Self {
        Self { config: None, repository: None, chain_clients: Vec::new() }
    }

    pub fn with_config(mut self, config: ArbitrageConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn with_config_file(mut self, file_name: &str) -> Result<Self> {
        let config = <ArbitrageConfig as ConfigLoader>::load_from_file(file_name.to_string()).await?;
        self.config = Some(config);
        Ok(self)
    }

    pub fn with_repository(mut self, repository: Arc<dyn PoolRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn add_chain_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.chain_clients.push(client);
        self
    }

    pub fn build(self) -> Result<ArbitrageService> {
        let repository = self.repository.ok_or_else(|| eyre!("a pool repository is required"))?;
        Ok(ArbitrageService::new(self.config.unwrap_or_default(), repository, self.chain_clients))
    }
}

impl Default for ArbitrageServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
