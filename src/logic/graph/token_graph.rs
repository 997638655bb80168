use crate::logic::pools::{Pool, PoolId, SwapQuote, best_pool_for_swap, pair_key};
use crate::utils::token::normalize_symbol;
use ahash::RandomState;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

pub type FastHasher = RandomState;
/// FastHashMap using ahash
pub type FastHashMap<K, V> = HashMap<K, V, FastHasher>;

#[derive(Debug, Clone)]
pub struct TokenNode {
    pub symbol: String,
}

impl TokenNode {
    pub fn new(symbol: &str) -> Self {
        Self { symbol: normalize_symbol(symbol) }
    }
}

#[derive(Debug, Clone)]
pub struct PoolEdge {
    pub pool: Arc<Pool>,
}

impl PoolEdge {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }
}

/// Undirected token multigraph. Nodes are token symbols, every tradeable pool is one edge,
/// so two tokens served by several pools are joined by parallel edges.
#[derive(Debug, Clone, Default)]
pub struct TokenGraph {
    // We never delete nodes or edges, the graph is rebuilt when the pool set changes
    pub graph: UnGraph<TokenNode, PoolEdge, usize>,
    pub pools: HashMap<PoolId, Arc<Pool>>,
    // symbol -> node index
    pub token_index: FastHashMap<String, NodeIndex<usize>>,
    // pool -> edge index
    pub pool_index: FastHashMap<PoolId, EdgeIndex<usize>>,
}

impl TokenGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pools<I: IntoIterator<Item = Pool>>(pools: I) -> Self {
        let mut token_graph = Self::new();
        for pool in pools {
            token_graph.add_pool(pool);
        }
        token_graph
    }

    pub fn add_or_get_token_idx(&mut self, symbol: &str) -> NodeIndex<usize> {
        let symbol = normalize_symbol(symbol);
        if let Some(&idx) = self.token_index.get(&symbol) {
            return idx;
        }
        let idx = self.graph.add_node(TokenNode { symbol: symbol.clone() });
        self.token_index.insert(symbol, idx);
        idx
    }

    /// Adds a pool as an edge. Untradeable pools and pools trading a token against itself
    /// are ignored. A pool id seen before replaces the stored pool state.
    pub fn add_pool(&mut self, pool: Pool) -> bool {
        if !pool.is_tradeable() {
            debug!(pool_id = %pool.id, "Skipping untradeable pool");
            return false;
        }
        let (symbol0, symbol1) = pool.symbols();
        if symbol0 == symbol1 {
            debug!(pool_id = %pool.id, "Skipping pool trading a token against itself");
            return false;
        }

        let node0 = self.add_or_get_token_idx(symbol0);
        let node1 = self.add_or_get_token_idx(symbol1);
        let pool = Arc::new(pool);

        if let Some(&edge_index) = self.pool_index.get(&pool.id) {
            let same_endpoints = self.graph.edge_endpoints(edge_index).map(|(a, b)| (a == node0 && b == node1) || (a == node1 && b == node0)).unwrap_or(false);
            if same_endpoints {
                if let Some(edge) = self.graph.edge_weight_mut(edge_index) {
                    edge.pool = pool.clone();
                    self.pools.insert(pool.id.clone(), pool);
                    return true;
                }
            }
            debug!(pool_id = %pool.id, "Pool changed its token pair, ignoring update");
            return false;
        }

        let edge_index = self.graph.add_edge(node0, node1, PoolEdge::new(pool.clone()));
        self.pool_index.insert(pool.id.clone(), edge_index);
        self.pools.insert(pool.id.clone(), pool);
        true
    }

    pub fn get_token_idx(&self, symbol: &str) -> Option<NodeIndex<usize>> {
        self.token_index.get(&normalize_symbol(symbol)).copied()
    }

    pub fn symbol_of(&self, idx: NodeIndex<usize>) -> Option<&str> {
        self.graph.node_weight(idx).map(|node| node.symbol.as_str())
    }

    pub fn get_pool(&self, pool_id: &PoolId) -> Option<&Arc<Pool>> {
        self.pools.get(pool_id)
    }

    /// Distinct tokens sharing at least one pool with `symbol`, sorted.
    pub fn neighbors(&self, symbol: &str) -> Vec<String> {
        let Some(idx) = self.get_token_idx(symbol) else {
            return Vec::new();
        };
        self.neighbor_indices(idx).into_iter().filter_map(|neighbor| self.symbol_of(neighbor).map(str::to_string)).collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Distinct neighbor nodes, in ascending index order.
    pub fn neighbor_indices(&self, idx: NodeIndex<usize>) -> Vec<NodeIndex<usize>> {
        let unique: BTreeSet<NodeIndex<usize>> = self.graph.neighbors(idx).collect();
        unique.into_iter().collect()
    }

    /// All pools (parallel edges) between two nodes.
    pub fn pools_between_idx(&self, a: NodeIndex<usize>, b: NodeIndex<usize>) -> Vec<&Arc<Pool>> {
        self.graph.edges(a).filter(|edge| edge.target() == b).map(|edge| &edge.weight().pool).collect()
    }

    pub fn pools_between(&self, symbol_a: &str, symbol_b: &str) -> Vec<&Arc<Pool>> {
        match (self.get_token_idx(symbol_a), self.get_token_idx(symbol_b)) {
            (Some(a), Some(b)) if a != b => self.pools_between_idx(a, b),
            _ => Vec::new(),
        }
    }

    /// Among the pools serving `token_in`/`token_out` and accepted by `filter`, the one giving
    /// the largest output for `amount_in`.
    pub fn best_pool_for<F>(&self, token_in: &str, token_out: &str, amount_in: f64, filter: F) -> Option<(Arc<Pool>, SwapQuote)>
    where
        F: Fn(&Pool) -> bool,
    {
        let candidates: Vec<&Arc<Pool>> = self.pools_between(token_in, token_out).into_iter().filter(|pool| filter(pool)).collect();
        best_pool_for_swap(candidates, token_in, amount_in).map(|(pool, quote)| (Arc::clone(pool), quote))
    }

    /// Token pairs served by at least one pool, as `(lower, higher)` symbols.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let pairs: BTreeSet<(String, String)> = self
            .pools
            .values()
            .map(|pool| {
                let (a, b) = pool.symbols();
                if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
            })
            .collect();
        pairs.into_iter().collect()
    }

    pub fn pair_keys(&self) -> BTreeSet<String> {
        self.pools.values().map(|pool| pair_key(pool.symbols().0, pool.symbols().1)).collect()
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        let mut ids: Vec<PoolId> = self.pools.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Order-independent description of the graph: every edge as (pool id, lower symbol, higher symbol).
    pub fn edge_summary(&self) -> Vec<(PoolId, String, String)> {
        let mut summary: Vec<(PoolId, String, String)> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let a = self.symbol_of(edge.source())?.to_string();
                let b = self.symbol_of(edge.target())?.to_string();
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                Some((edge.weight().pool.id.clone(), low, high))
            })
            .collect();
        summary.sort();
        summary
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::MockPoolBuilder;

    fn triangle() -> Vec<Pool> {
        vec![
            MockPoolBuilder::new("eth-usdc-1", "ETH", "USDC").reserves(100.0, 200_000.0).build(),
            MockPoolBuilder::new("eth-usdc-2", "USDC", "ETH").reserves(400_000.0, 200.0).build(),
            MockPoolBuilder::new("usdc-dai", "USDC", "DAI").reserves(1_000_000.0, 1_000_000.0).build(),
            MockPoolBuilder::new("dai-eth", "DAI", "ETH").reserves(200_000.0, 100.0).build(),
        ]
    }

    #[test]
    fn test_parallel_edges() {
        let token_graph = TokenGraph::from_pools(triangle());

        assert_eq!(token_graph.node_count(), 3);
        assert_eq!(token_graph.edge_count(), 4);
        assert_eq!(token_graph.pools_between("eth", "usdc").len(), 2);
        assert_eq!(token_graph.pools_between("USDC", "ETH").len(), 2);
        assert_eq!(token_graph.neighbors("ETH"), vec!["DAI".to_string(), "USDC".to_string()]);
        assert_eq!(token_graph.pairs().len(), 3);
        assert_eq!(token_graph.pair_keys().into_iter().collect::<Vec<_>>(), vec!["DAI/ETH", "DAI/USDC", "ETH/USDC"]);
    }

    #[test]
    fn test_untradeable_pools_are_not_edges() {
        let mut pools = triangle();
        pools.push(MockPoolBuilder::new("empty", "ETH", "WBTC").reserves(0.0, 10.0).build());
        pools.push(MockPoolBuilder::new("inactive", "ETH", "LINK").active(false).build());

        let token_graph = TokenGraph::from_pools(pools);
        assert_eq!(token_graph.edge_count(), 4);
        assert!(token_graph.get_pool(&PoolId::from("empty")).is_none());
        assert!(token_graph.neighbors("WBTC").is_empty());
    }

    #[test]
    fn test_best_pool_for_pair() {
        let token_graph = TokenGraph::from_pools(triangle());

        let (pool, quote) = token_graph.best_pool_for("ETH", "USDC", 1.0, |_| true).unwrap();
        assert_eq!(pool.id, PoolId::from("eth-usdc-2"));
        assert!(quote.amount_out > 1900.0);

        let (pool, _) = token_graph.best_pool_for("ETH", "USDC", 1.0, |pool| pool.id != PoolId::from("eth-usdc-2")).unwrap();
        assert_eq!(pool.id, PoolId::from("eth-usdc-1"));

        assert!(token_graph.best_pool_for("ETH", "WBTC", 1.0, |_| true).is_none());
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let first = TokenGraph::from_pools(triangle());
        let mut reversed = triangle();
        reversed.reverse();
        let second = TokenGraph::from_pools(reversed);

        assert_eq!(first.edge_summary(), second.edge_summary());
        assert_eq!(first.pool_ids(), second.pool_ids());
    }

    #[test]
    fn test_readding_pool_updates_state() {
        let mut token_graph = TokenGraph::from_pools(triangle());
        let updated = MockPoolBuilder::new("usdc-dai", "USDC", "DAI").reserves(5.0, 5.0).build();

        assert!(token_graph.add_pool(updated));
        assert_eq!(token_graph.edge_count(), 4);
        assert_eq!(token_graph.get_pool(&PoolId::from("usdc-dai")).unwrap().reserve0, 5.0);
    }
}
