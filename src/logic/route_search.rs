use super::gas::GasCostTable;
use super::graph::{CycleCandidate, CycleHop, CycleSearchParams, RouteHash, TokenGraph, find_cycles};
use super::pools::{Pool, PoolId};
use super::scoring::{ViabilityInputs, compare_routes, execution_complexity, risk_score, viability_score};
use super::types::{ArbitrageRoute, RouteConstraints, RouteSearchConfig, RouteStep, RouteStrategy};
use crate::utils::cache::TtlCache;
use crate::utils::constants::Chain;
use crate::utils::token::normalize_symbol;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// Shortest cycle considered by the multi-hop strategy. Two-pool cycles belong to the direct one.
const MIN_MULTI_HOP_LENGTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteCacheKey {
    pub token_a: String,
    pub token_b: String,
    /// Bit pattern of the input amount, so equal floats share an entry.
    pub amount_bits: u64,
    pub constraints: String,
}

impl RouteCacheKey {
    pub fn new(token_a: &str, token_b: &str, amount_in: f64, constraints: &RouteConstraints) -> Self {
        Self { token_a: normalize_symbol(token_a), token_b: normalize_symbol(token_b), amount_bits: amount_in.to_bits(), constraints: constraints.cache_key() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteFinderStats {
    pub token_count: usize,
    pub pool_count: usize,
    pub cached_queries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub pool_updates: u64,
}

/// Multi-strategy arbitrage route search over the token graph.
///
/// Searches are synchronous; results are memoized per (pair, amount, constraints) until the
/// pool set changes or the entry outlives the route cache TTL.
pub struct ArbitrageRouteFinder {
    config: RouteSearchConfig,
    gas_table: GasCostTable,
    token_graph: TokenGraph,
    route_cache: TtlCache<RouteCacheKey, Vec<ArbitrageRoute>>,
    pool_updates: u64,
}

impl ArbitrageRouteFinder {
    pub fn new(config: RouteSearchConfig, gas_table: GasCostTable) -> Self {
        let route_cache = TtlCache::new(config.route_cache_ttl());
        Self { config, gas_table, token_graph: TokenGraph::new(), route_cache, pool_updates: 0 }
    }

    pub fn config(&self) -> &RouteSearchConfig {
        &self.config
    }

    pub fn token_graph(&self) -> &TokenGraph {
        &self.token_graph
    }

    /// Rebuilds the token graph from `pools` and drops every cached search result.
    pub fn update_pools(&mut self, pools: Vec<Pool>) {
        self.token_graph = TokenGraph::from_pools(pools);
        self.route_cache.invalidate_all();
        self.pool_updates += 1;
        info!(tokens = self.token_graph.node_count(), pools = self.token_graph.edge_count(), "Token graph rebuilt, route cache cleared");
    }

    /// A new finder with the same settings over `pools`, starting with an empty route cache.
    pub fn rebuilt(&self, pools: Vec<Pool>) -> Self {
        let mut finder = ArbitrageRouteFinder::new(self.config.clone(), self.gas_table.clone());
        finder.pool_updates = self.pool_updates;
        finder.update_pools(pools);
        finder
    }

    pub fn cached_queries(&self) -> usize {
        self.route_cache.len()
    }

    pub fn stats(&self) -> RouteFinderStats {
        RouteFinderStats {
            token_count: self.token_graph.node_count(),
            pool_count: self.token_graph.edge_count(),
            cached_queries: self.route_cache.len(),
            cache_hits: self.route_cache.stats.hits.load(Ordering::Relaxed),
            cache_misses: self.route_cache.stats.misses.load(Ordering::Relaxed),
            cache_hit_rate: self.route_cache.stats.hit_rate(),
            pool_updates: self.pool_updates,
        }
    }

    /// Profitable cycles starting with `amount_in` of `token_a` and trading through `token_b`,
    /// ranked by viability then profit. Never fails: unquotable candidates are dropped.
    pub fn find_arbitrage_routes(&self, token_a: &str, token_b: &str, amount_in: f64, constraints: &RouteConstraints) -> Vec<ArbitrageRoute> {
        if !amount_in.is_finite() || amount_in <= 0.0 {
            warn!(token_a, token_b, amount_in, "Ignoring route search with invalid amount");
            return Vec::new();
        }

        let key = RouteCacheKey::new(token_a, token_b, amount_in, constraints);
        if let Some(routes) = self.route_cache.get(&key) {
            debug!(token_a, token_b, "Route cache hit");
            return routes;
        }

        let token_a = normalize_symbol(token_a);
        let token_b = normalize_symbol(token_b);

        let mut routes = self.find_direct_arbitrage(&token_a, &token_b, amount_in, constraints);
        routes.extend(self.find_multi_hop_arbitrage(&token_a, &token_b, amount_in, constraints));
        routes.extend(self.find_cross_chain_arbitrage(&token_a, &token_b, amount_in, constraints));

        let routes = rank_routes(routes, constraints.min_profit);
        debug!(token_a = %token_a, token_b = %token_b, routes = routes.len(), "Route search finished");

        self.route_cache.insert(key, routes.clone());
        routes
    }

    /// Buy on one pool of the pair, sell on another. Every ordered pool pair is tried.
    pub fn find_direct_arbitrage(&self, token_a: &str, token_b: &str, amount_in: f64, constraints: &RouteConstraints) -> Vec<ArbitrageRoute> {
        if token_a == token_b || constraints.max_hops < 2 {
            return Vec::new();
        }
        let pools: Vec<&Arc<Pool>> = self.token_graph.pools_between(token_a, token_b).into_iter().filter(|pool| constraints.allows_pool(pool)).collect();

        let pairs: Vec<(&Arc<Pool>, &Arc<Pool>)> =
            pools.iter().flat_map(|buy| pools.iter().filter(move |sell| sell.id != buy.id).map(move |sell| (*buy, *sell))).collect();

        let evaluate = |(buy, sell): &(&Arc<Pool>, &Arc<Pool>)| self.evaluate_direct(buy, sell, token_a, token_b, amount_in, constraints);

        if self.config.enable_parallel_calculation {
            pairs.par_iter().filter_map(evaluate).collect()
        } else {
            pairs.iter().filter_map(evaluate).collect()
        }
    }

    fn evaluate_direct(&self, buy: &Arc<Pool>, sell: &Arc<Pool>, token_a: &str, token_b: &str, amount_in: f64, constraints: &RouteConstraints) -> Option<ArbitrageRoute> {
        let first = match buy.get_amount_out(token_a, amount_in) {
            Ok(quote) => quote,
            Err(e) => {
                debug!(pool_id = %buy.id, "Direct candidate dropped: {}", e);
                return None;
            }
        };
        let second = match sell.get_amount_out(token_b, first.amount_out) {
            Ok(quote) => quote,
            Err(e) => {
                debug!(pool_id = %sell.id, "Direct candidate dropped: {}", e);
                return None;
            }
        };

        let candidate = CycleCandidate {
            hops: vec![
                CycleHop { pool: Arc::clone(buy), token_in: token_a.to_string(), token_out: token_b.to_string(), amount_in, quote: first },
                CycleHop { pool: Arc::clone(sell), token_in: token_b.to_string(), token_out: token_a.to_string(), amount_in: first.amount_out, quote: second },
            ],
            amount_in,
            amount_out: second.amount_out,
            total_price_impact: first.price_impact + second.price_impact,
        };
        self.build_route(RouteStrategy::Direct, &candidate, constraints)
    }

    /// Cycles of three or more hops anchored at `token_a` and passing through `token_b`.
    pub fn find_multi_hop_arbitrage(&self, token_a: &str, token_b: &str, amount_in: f64, constraints: &RouteConstraints) -> Vec<ArbitrageRoute> {
        if constraints.max_hops < MIN_MULTI_HOP_LENGTH {
            return Vec::new();
        }
        let params = CycleSearchParams {
            min_hops: MIN_MULTI_HOP_LENGTH,
            max_hops: constraints.max_hops,
            max_price_impact: constraints.max_price_impact,
            max_iterations: self.config.max_search_iterations,
        };
        if constraints.allow_cross_chain {
            let cycles = find_cycles(&self.token_graph, token_a, token_b, amount_in, &params, |pool| constraints.allows_pool(pool));
            return cycles.iter().filter_map(|candidate| self.build_route(RouteStrategy::MultiHop, candidate, constraints)).collect();
        }

        // one search per chain so every cycle stays on the chain of its first hop
        self.start_chains(token_a, constraints)
            .into_iter()
            .flat_map(|chain| {
                let cycles = find_cycles(&self.token_graph, token_a, token_b, amount_in, &params, |pool| constraints.allows_pool(pool) && pool.chain == chain);
                cycles.into_iter().filter_map(|candidate| self.build_route(RouteStrategy::MultiHop, &candidate, constraints)).collect::<Vec<_>>()
            })
            .collect()
    }

    /// Bridging between chains is not modelled, this strategy yields no routes.
    pub fn find_cross_chain_arbitrage(&self, _token_a: &str, _token_b: &str, _amount_in: f64, constraints: &RouteConstraints) -> Vec<ArbitrageRoute> {
        if constraints.allow_cross_chain {
            debug!("Cross-chain route search is not supported");
        }
        Vec::new()
    }

    /// Chains of the allowed pools trading `symbol`, in a stable order.
    fn start_chains(&self, symbol: &str, constraints: &RouteConstraints) -> BTreeSet<Chain> {
        self.token_graph
            .neighbors(symbol)
            .iter()
            .flat_map(|neighbor| self.token_graph.pools_between(symbol, neighbor))
            .filter(|pool| constraints.allows_pool(pool))
            .map(|pool| pool.chain)
            .collect()
    }

    /// Turns a realized cycle into a scored route, or `None` if it breaks a constraint.
    fn build_route(&self, strategy: RouteStrategy, candidate: &CycleCandidate, constraints: &RouteConstraints) -> Option<ArbitrageRoute> {
        let hop_count = candidate.len();
        if hop_count == 0 || hop_count > constraints.max_hops {
            return None;
        }
        if candidate.total_price_impact > constraints.max_price_impact {
            debug!(hops = hop_count, impact = candidate.total_price_impact, "Route rejected: price impact");
            return None;
        }

        let first = candidate.hops.first()?;
        let Some(start_usd_price) = first.pool.token_usd_price(&first.token_in) else {
            debug!(pool_id = %first.pool.id, "Route rejected: no USD price for start token");
            return None;
        };

        let cross_chain = candidate.hops.iter().any(|hop| hop.pool.chain != first.pool.chain);
        if cross_chain && !constraints.allow_cross_chain {
            return None;
        }

        let steps: Vec<RouteStep> = candidate
            .hops
            .iter()
            .map(|hop| RouteStep {
                pool_id: hop.pool.id.clone(),
                chain: hop.pool.chain,
                dex: hop.pool.dex.clone(),
                token_in: hop.token_in.clone(),
                token_out: hop.token_out.clone(),
                amount_in: hop.amount_in,
                amount_out: hop.quote.amount_out,
                price_impact: hop.quote.price_impact,
                gas_estimate: self.gas_table.hop_cost_usd(hop.pool.chain),
            })
            .collect();

        let total_gas_estimate: f64 = steps.iter().map(|step| step.gas_estimate).sum();
        if total_gas_estimate > constraints.max_gas_cost {
            debug!(hops = hop_count, gas = total_gas_estimate, "Route rejected: gas cost");
            return None;
        }

        let liquidity_utilization = candidate.hops.iter().map(hop_liquidity_utilization).fold(0.0, f64::max);
        if liquidity_utilization > constraints.max_liquidity_utilization {
            debug!(hops = hop_count, liquidity_utilization, "Route rejected: liquidity utilization");
            return None;
        }

        let input_usd = candidate.amount_in * start_usd_price;
        let gross_profit = (candidate.amount_out - candidate.amount_in) * start_usd_price;
        let estimated_profit = gross_profit - total_gas_estimate;
        if estimated_profit < constraints.min_profit {
            debug!(hops = hop_count, estimated_profit, "Route rejected: profit");
            return None;
        }
        let profit_margin = if input_usd > 0.0 { estimated_profit / input_usd } else { 0.0 };

        let viability_score = viability_score(&ViabilityInputs {
            profit_margin,
            gross_profit,
            gas_cost: total_gas_estimate,
            total_price_impact: candidate.total_price_impact,
            hop_count,
        });

        Some(ArbitrageRoute {
            id: route_hash(&steps),
            strategy,
            total_gas_estimate,
            estimated_profit,
            profit_margin,
            risk_score: risk_score(hop_count, candidate.total_price_impact, cross_chain),
            liquidity_utilization,
            execution_complexity: execution_complexity(hop_count),
            flash_loan_required: input_usd > self.config.flash_loan_threshold_usd,
            cross_chain,
            viability_score,
            steps,
        })
    }

    /// Best routes over every token pair in the graph, using the default constraints and a
    /// trade of `default_trade_usd` priced at the deepest pool of the pair.
    pub fn get_top_opportunities(&self, limit: usize) -> Vec<ArbitrageRoute> {
        let constraints = self.config.default_constraints.clone();
        let mut routes = Vec::new();

        for (symbol_a, symbol_b) in self.token_graph.pairs() {
            for (start, via) in [(&symbol_a, &symbol_b), (&symbol_b, &symbol_a)] {
                let Some(amount_in) = self.default_trade_amount(start, via) else {
                    continue;
                };
                routes.extend(self.find_arbitrage_routes(start, via, amount_in, &constraints));
            }
        }

        // the same cycle comes back once per start token, keep its best-ranked rotation
        let mut seen = HashSet::new();
        rank_routes(routes, constraints.min_profit).into_iter().filter(|route| seen.insert(cycle_hash(route))).take(limit).collect()
    }

    fn default_trade_amount(&self, start: &str, via: &str) -> Option<f64> {
        let deepest = self.token_graph.pools_between(start, via).into_iter().max_by(|a, b| a.liquidity_usd.total_cmp(&b.liquidity_usd).then_with(|| b.id.cmp(&a.id)))?;
        let usd_price = deepest.token_usd_price(start)?;
        let amount = self.config.default_trade_usd / usd_price;
        (amount.is_finite() && amount > 0.0).then_some(amount)
    }

    pub fn get_pool(&self, pool_id: &PoolId) -> Option<&Arc<Pool>> {
        self.token_graph.get_pool(pool_id)
    }
}

/// Share of a pool's USD liquidity consumed by the input of one hop.
fn hop_liquidity_utilization(hop: &CycleHop) -> f64 {
    match hop.pool.token_usd_price(&hop.token_in) {
        Some(usd_price) if hop.pool.liquidity_usd > 0.0 => (hop.amount_in * usd_price / hop.pool.liquidity_usd).min(1.0),
        _ => 1.0,
    }
}

fn route_hash(steps: &[RouteStep]) -> RouteHash {
    RouteHash::from_parts(steps.iter().flat_map(|step| [step.pool_id.as_str(), step.token_in.as_str(), step.token_out.as_str()]))
}

/// Identity of the pool cycle regardless of where it starts: the pool sequence rotated to begin
/// at its smallest pool id.
fn cycle_hash(route: &ArbitrageRoute) -> RouteHash {
    let pools: Vec<&str> = route.steps.iter().map(|step| step.pool_id.as_str()).collect();
    let start = pools.iter().enumerate().min_by_key(|(_, id)| **id).map(|(idx, _)| idx).unwrap_or(0);
    RouteHash::from_parts(pools[start..].iter().chain(pools[..start].iter()).copied())
}

/// Drops routes under `min_profit`, removes duplicates and sorts best first.
pub fn rank_routes(routes: Vec<ArbitrageRoute>, min_profit: f64) -> Vec<ArbitrageRoute> {
    let mut ranked: Vec<ArbitrageRoute> = routes.into_iter().filter(|route| route.estimated_profit >= min_profit).collect();
    ranked.sort_by(compare_routes);
    // sorted first so the best-scoring duplicate survives
    let mut seen = HashSet::new();
    ranked.retain(|route| seen.insert(route.id.clone()));
    ranked
}

/// Builder for [`ArbitrageRouteFinder`].
pub struct ArbitrageRouteFinderBuilder {
    config: RouteSearchConfig,
    gas_table: GasCostTable,
    pools: Vec<Pool>,
}

impl ArbitrageRouteFinderBuilder {
    pub fn new() -> Self {
        Self { config: RouteSearchConfig::default(), gas_table: GasCostTable::default(), pools: Vec::new() }
    }

    pub fn with_config(mut self, config: RouteSearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_gas_table(mut self, gas_table: GasCostTable) -> Self {
        self.gas_table = gas_table;
        self
    }

    pub fn with_default_constraints(mut self, constraints: RouteConstraints) -> Self {
        self.config.default_constraints = constraints;
        self
    }

    pub fn with_parallel_calculation(mut self, enabled: bool) -> Self {
        self.config.enable_parallel_calculation = enabled;
        self
    }

    pub fn with_pools(mut self, pools: Vec<Pool>) -> Self {
        self.pools = pools;
        self
    }

    pub fn build(self) -> ArbitrageRouteFinder {
        let mut finder = ArbitrageRouteFinder::new(self.config, self.gas_table);
        if !self.pools.is_empty() {
            finder.update_pools(self.pools);
        }
        finder
    }
}

impl Default for ArbitrageRouteFinderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::MockPoolBuilder;
    use crate::logic::types::ExecutionComplexity;

    fn loose_constraints() -> RouteConstraints {
        RouteConstraints::default().with_min_profit(1.0).with_max_liquidity_utilization(1.0).with_max_price_impact(0.2)
    }

    /// ETH/USDC quoted at 2000 on one pool and 2100 on another, on a cheap chain.
    fn spread_pools() -> Vec<Pool> {
        vec![
            MockPoolBuilder::new("cheap", "ETH", "USDC").chain(Chain::Arbitrum).reserves(1_000.0, 2_000_000.0).liquidity_usd(4_000_000.0).build(),
            MockPoolBuilder::new("dear", "ETH", "USDC").chain(Chain::Arbitrum).reserves(1_000.0, 2_100_000.0).liquidity_usd(4_200_000.0).build(),
        ]
    }

    /// A->B->C->A where the C->A pool overprices A, giving a profitable triangle.
    fn triangle_pools() -> Vec<Pool> {
        vec![
            MockPoolBuilder::new("ab", "A", "B").chain(Chain::Polygon).reserves(100_000.0, 100_000.0).liquidity_usd(200_000.0).fee_ppm(0).build(),
            MockPoolBuilder::new("bc", "B", "C").chain(Chain::Polygon).reserves(100_000.0, 100_000.0).liquidity_usd(200_000.0).fee_ppm(0).build(),
            MockPoolBuilder::new("ca", "C", "A").chain(Chain::Polygon).reserves(100_000.0, 110_000.0).liquidity_usd(200_000.0).fee_ppm(0).build(),
        ]
    }

    fn finder(pools: Vec<Pool>) -> ArbitrageRouteFinder {
        ArbitrageRouteFinderBuilder::new().with_pools(pools).build()
    }

    #[test]
    fn test_direct_arbitrage_buys_low_sells_high() {
        let finder = finder(spread_pools());
        let routes = finder.find_arbitrage_routes("USDC", "ETH", 10_000.0, &loose_constraints());

        assert_eq!(routes.len(), 1);
        let route = &routes[0];
        assert_eq!(route.strategy, RouteStrategy::Direct);
        assert_eq!(route.steps[0].pool_id, PoolId::from("cheap"));
        assert_eq!(route.steps[1].pool_id, PoolId::from("dear"));
        assert!(route.is_closed_cycle());
        assert_eq!(route.execution_complexity, ExecutionComplexity::Simple);
        assert_eq!(route.total_gas_estimate, 2.0);
        assert!(route.estimated_profit > 1.0);
        assert!(!route.flash_loan_required);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let parallel = finder(spread_pools());
        let sequential = ArbitrageRouteFinderBuilder::new().with_parallel_calculation(false).with_pools(spread_pools()).build();

        let a = parallel.find_direct_arbitrage("USDC", "ETH", 10_000.0, &loose_constraints());
        let b = sequential.find_direct_arbitrage("USDC", "ETH", 10_000.0, &loose_constraints());
        assert_eq!(rank_routes(a, 0.0), rank_routes(b, 0.0));
    }

    #[test]
    fn test_triangle_is_found() {
        let finder = finder(triangle_pools());
        let routes = finder.find_arbitrage_routes("A", "B", 1_000.0, &loose_constraints());

        assert_eq!(routes.len(), 1);
        let route = &routes[0];
        assert_eq!(route.strategy, RouteStrategy::MultiHop);
        assert_eq!(route.hop_count(), 3);
        assert_eq!(route.execution_complexity, ExecutionComplexity::Medium);
        assert!(route.is_closed_cycle());
        assert_eq!(route.start_token(), Some("A"));
        assert!(route.amount_out() > route.amount_in());
        assert!(route.risk_score >= 3.0 && route.risk_score <= 10.0);
        assert!(route.viability_score > 0.0 && route.viability_score <= 10.0);
    }

    #[test]
    fn test_constraints_are_enforced() {
        let finder = finder(triangle_pools());

        let two_hops = loose_constraints().with_max_hops(2);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &two_hops).is_empty());

        let greedy = loose_constraints().with_min_profit(1e9);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &greedy).is_empty());

        let tight_impact = loose_constraints().with_max_price_impact(0.001);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &tight_impact).is_empty());

        let no_gas_budget = loose_constraints().with_max_gas_cost(0.1);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &no_gas_budget).is_empty());

        let small_share = loose_constraints().with_max_liquidity_utilization(0.001);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &small_share).is_empty());

        let other_chain = loose_constraints().with_preferred_chains(vec![Chain::Base]);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &other_chain).is_empty());

        let without_c = loose_constraints().with_excluded_tokens(vec!["c".to_string()]);
        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &without_c).is_empty());
    }

    #[test]
    fn test_single_chain_cycles_unless_cross_chain_allowed() {
        let mut pools = triangle_pools();
        // move the closing leg to another chain
        pools[2].chain = Chain::Arbitrum;
        let finder = finder(pools);

        assert!(finder.find_arbitrage_routes("A", "B", 1_000.0, &loose_constraints()).is_empty());

        let cross = loose_constraints().with_cross_chain(true);
        let routes = finder.find_arbitrage_routes("A", "B", 1_000.0, &cross);
        assert_eq!(routes.len(), 1);
        assert!(routes[0].cross_chain);
        assert!(finder.find_cross_chain_arbitrage("A", "B", 1_000.0, &cross).is_empty());
    }

    #[test]
    fn test_cycles_on_other_chains_are_still_searched() {
        let constraints = loose_constraints();
        assert_eq!(finder(triangle_pools()).find_arbitrage_routes("A", "B", 1_000.0, &constraints).len(), 1);

        // a much deeper A/B pool on another chain must not hide the Polygon triangle
        let mut pools = triangle_pools();
        pools.push(MockPoolBuilder::new("ab-eth", "A", "B").chain(Chain::Ethereum).reserves(100_000.0, 100_000.0).liquidity_usd(1e9).fee_ppm(0).build());
        let routes = finder(pools).find_arbitrage_routes("A", "B", 1_000.0, &constraints);

        assert_eq!(routes.len(), 1);
        assert!(!routes[0].cross_chain);
        assert!(routes[0].steps.iter().all(|step| step.chain == Chain::Polygon));
        assert!(routes[0].steps.iter().all(|step| step.pool_id != PoolId::from("ab-eth")));
    }

    #[test]
    fn test_top_opportunities_keep_one_rotation_per_cycle() {
        let finder = ArbitrageRouteFinderBuilder::new().with_default_constraints(loose_constraints()).with_pools(triangle_pools()).build();

        let top = finder.get_top_opportunities(10);
        assert_eq!(top.len(), 1);

        // every rotation is found on its own, the sweep keeps the best-ranked one
        let mut rotations = Vec::new();
        for (start, via) in [("A", "B"), ("A", "C"), ("B", "A"), ("B", "C"), ("C", "A"), ("C", "B")] {
            let amount = finder.default_trade_amount(start, via).unwrap();
            rotations.extend(finder.find_arbitrage_routes(start, via, amount, &loose_constraints()));
        }
        assert_eq!(rotations.len(), 6);
        assert_eq!(top[0], rank_routes(rotations, 0.0)[0]);
    }

    #[test]
    fn test_route_cache_entries_expire() {
        let config = RouteSearchConfig { route_cache_ttl_secs: 1, ..Default::default() };
        let finder = ArbitrageRouteFinderBuilder::new().with_config(config).with_pools(triangle_pools()).build();
        let constraints = loose_constraints();

        finder.find_arbitrage_routes("A", "B", 1_000.0, &constraints);
        finder.find_arbitrage_routes("A", "B", 1_000.0, &constraints);
        assert_eq!(finder.stats().cache_hits, 1);
        assert_eq!(finder.stats().cache_misses, 1);

        std::thread::sleep(std::time::Duration::from_millis(1_100));
        let routes = finder.find_arbitrage_routes("A", "B", 1_000.0, &constraints);
        assert_eq!(routes.len(), 1);
        let stats = finder.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 2);
        assert_eq!(stats.cached_queries, 1);
    }

    #[test]
    fn test_route_cache_hits_and_invalidation() {
        let mut finder = finder(triangle_pools());
        let constraints = loose_constraints();

        let first = finder.find_arbitrage_routes("A", "B", 1_000.0, &constraints);
        let second = finder.find_arbitrage_routes("a", "b", 1_000.0, &constraints);
        assert_eq!(first, second);
        assert_eq!(finder.cached_queries(), 1);
        assert_eq!(finder.stats().cache_hits, 1);

        finder.find_arbitrage_routes("A", "B", 1_000.0, &constraints.clone().with_min_profit(2.0));
        assert_eq!(finder.cached_queries(), 2);

        finder.update_pools(triangle_pools());
        assert_eq!(finder.cached_queries(), 0);

        finder.find_arbitrage_routes("A", "B", 1_000.0, &constraints);
        let rebuilt = finder.rebuilt(triangle_pools());
        assert_eq!(rebuilt.cached_queries(), 0);
        assert_eq!(rebuilt.stats().pool_updates, 3);
        assert_eq!(rebuilt.token_graph().edge_summary(), finder.token_graph().edge_summary());
        assert_eq!(finder.cached_queries(), 1);
    }

    #[test]
    fn test_invalid_amount_returns_nothing() {
        let finder = finder(triangle_pools());
        assert!(finder.find_arbitrage_routes("A", "B", 0.0, &loose_constraints()).is_empty());
        assert!(finder.find_arbitrage_routes("A", "B", f64::NAN, &loose_constraints()).is_empty());
        assert!(finder.find_arbitrage_routes("A", "UNKNOWN", 1.0, &loose_constraints()).is_empty());
        assert_eq!(finder.cached_queries(), 1);
    }

    #[test]
    fn test_ranking_and_dedup() {
        let mut pools = triangle_pools();
        pools.extend(spread_pools());
        let finder = ArbitrageRouteFinderBuilder::new().with_default_constraints(loose_constraints()).with_pools(pools).build();

        let top = finder.get_top_opportunities(10);
        assert!(!top.is_empty());
        for pair in top.windows(2) {
            assert!(compare_routes(&pair[0], &pair[1]) != std::cmp::Ordering::Greater);
        }
        let ids: HashSet<&RouteHash> = top.iter().map(|route| &route.id).collect();
        assert_eq!(ids.len(), top.len());

        assert_eq!(finder.get_top_opportunities(1).len(), 1);
    }
}
