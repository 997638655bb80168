use super::token_graph::TokenGraph;
use crate::logic::pools::{Pool, SwapQuote, best_pool_for_swap};
use petgraph::graph::NodeIndex;
use std::sync::Arc;
use tracing::{debug, error};

/// One executed swap of a candidate cycle.
#[derive(Debug, Clone)]
pub struct CycleHop {
    pub pool: Arc<Pool>,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub quote: SwapQuote,
}

/// A closed cycle that survived the price impact bound, with its realized output.
#[derive(Debug, Clone)]
pub struct CycleCandidate {
    pub hops: Vec<CycleHop>,
    pub amount_in: f64,
    pub amount_out: f64,
    pub total_price_impact: f64,
}

impl CycleCandidate {
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CycleSearchParams {
    /// Minimum cycle length, in hops.
    pub min_hops: usize,
    pub max_hops: usize,
    pub max_price_impact: f64,
    pub max_iterations: usize,
}

/// State of one branch of the search. Every frame owns its token path, so the
/// visited check is a lookup in the branch's own path and never leaks into siblings.
#[derive(Debug)]
struct PathState {
    node: NodeIndex<usize>,
    path: Vec<NodeIndex<usize>>,
    hops: Vec<CycleHop>,
    amount: f64,
    price_impact: f64,
}

/// Finds simple cycles starting and ending at `start` that pass through `via`.
///
/// The search is depth first over an explicit stack. At each hop the best pool for the current
/// running amount is picked among those accepted by `pool_filter`; a branch is dropped as soon
/// as its cumulative price impact exceeds `params.max_price_impact`.
pub fn find_cycles<F>(token_graph: &TokenGraph, start: &str, via: &str, amount_in: f64, params: &CycleSearchParams, pool_filter: F) -> Vec<CycleCandidate>
where
    F: Fn(&Pool) -> bool,
{
    let (Some(start_node), Some(via_node)) = (token_graph.get_token_idx(start), token_graph.get_token_idx(via)) else {
        return Vec::new();
    };
    if !amount_in.is_finite() || amount_in <= 0.0 || params.max_hops < params.min_hops.max(2) {
        return Vec::new();
    }

    let mut cycles = Vec::new();
    let mut stack = vec![PathState { node: start_node, path: vec![start_node], hops: Vec::new(), amount: amount_in, price_impact: 0.0 }];
    let mut searched_path_counter = 0usize;

    while let Some(PathState { node, path, hops, amount, price_impact }) = stack.pop() {
        // Upper limit to bound the search space on dense graphs
        if searched_path_counter >= params.max_iterations {
            error!(start, via, max_hops = params.max_hops, "Cycle search too many iterations, returning partial result");
            break;
        }
        searched_path_counter += 1;

        let next_hop_count = hops.len() + 1;
        if next_hop_count > params.max_hops {
            continue;
        }

        let Some(token_in) = token_graph.symbol_of(node) else {
            continue;
        };

        for next in token_graph.neighbor_indices(node) {
            let closes = next == start_node;
            if closes {
                if next_hop_count < params.min_hops || !path.contains(&via_node) {
                    continue;
                }
            } else if path.contains(&next) || next_hop_count == params.max_hops {
                // Either revisits a token or could not close the cycle any more
                continue;
            }

            let Some(token_out) = token_graph.symbol_of(next) else {
                continue;
            };

            let candidates: Vec<&Arc<Pool>> = token_graph
                .pools_between_idx(node, next)
                .into_iter()
                .filter(|pool| pool_filter(pool))
                .filter(|pool| !hops.iter().any(|hop| hop.pool.id == pool.id))
                .collect();
            let Some((pool, quote)) = best_pool_for_swap(candidates, token_in, amount) else {
                continue;
            };

            let cumulative_impact = price_impact + quote.price_impact;
            if cumulative_impact > params.max_price_impact {
                debug!(pool_id = %pool.id, cumulative_impact, "Pruning branch over price impact bound");
                continue;
            }
            if quote.amount_out <= 0.0 {
                continue;
            }

            let mut new_hops = hops.clone();
            new_hops.push(CycleHop { pool: Arc::clone(pool), token_in: token_in.to_string(), token_out: token_out.to_string(), amount_in: amount, quote });

            if closes {
                cycles.push(CycleCandidate { hops: new_hops, amount_in, amount_out: quote.amount_out, total_price_impact: cumulative_impact });
            } else {
                let mut new_path = path.clone();
                new_path.push(next);
                stack.push(PathState { node: next, path: new_path, hops: new_hops, amount: quote.amount_out, price_impact: cumulative_impact });
            }
        }
    }

    debug!(start, via, cycles = cycles.len(), iterations = searched_path_counter, "Cycle search finished");
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::{MockPoolBuilder, PoolId};

    fn params(max_hops: usize) -> CycleSearchParams {
        CycleSearchParams { min_hops: 3, max_hops, max_price_impact: 1.0, max_iterations: 10_000 }
    }

    fn square() -> TokenGraph {
        TokenGraph::from_pools(vec![
            MockPoolBuilder::new("a-b", "A", "B").reserves(10_000.0, 10_000.0).build(),
            MockPoolBuilder::new("b-c", "B", "C").reserves(10_000.0, 10_000.0).build(),
            MockPoolBuilder::new("c-a", "C", "A").reserves(10_000.0, 10_000.0).build(),
            MockPoolBuilder::new("c-d", "C", "D").reserves(10_000.0, 10_000.0).build(),
            MockPoolBuilder::new("d-a", "D", "A").reserves(10_000.0, 10_000.0).build(),
        ])
    }

    #[test]
    fn test_finds_triangles_and_squares() {
        let token_graph = square();

        let triangles = find_cycles(&token_graph, "A", "B", 10.0, &params(3), |_| true);
        // A->B->C->A and A->C->B->A
        assert_eq!(triangles.len(), 2);
        assert!(triangles.iter().all(|cycle| cycle.len() == 3));

        let up_to_four = find_cycles(&token_graph, "A", "B", 10.0, &params(4), |_| true);
        // plus A->B->C->D->A and A->D->C->B->A
        assert_eq!(up_to_four.len(), 4);
    }

    #[test]
    fn test_cycles_are_chained_and_closed() {
        let token_graph = square();

        for cycle in find_cycles(&token_graph, "A", "C", 10.0, &params(4), |_| true) {
            assert_eq!(cycle.hops.first().unwrap().token_in, "A");
            assert_eq!(cycle.hops.last().unwrap().token_out, "A");
            for pair in cycle.hops.windows(2) {
                assert_eq!(pair[0].quote.amount_out, pair[1].amount_in);
                assert_eq!(pair[0].token_out, pair[1].token_in);
            }
            assert_eq!(cycle.hops.last().unwrap().quote.amount_out, cycle.amount_out);
        }
    }

    #[test]
    fn test_cycle_must_pass_through_via() {
        let token_graph = square();
        let cycles = find_cycles(&token_graph, "A", "D", 10.0, &params(3), |_| true);
        // A->C->D->A and A->D->C->A
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().all(|cycle| cycle.hops.iter().any(|hop| hop.token_in == "D")));
    }

    #[test]
    fn test_price_impact_bound_prunes() {
        let token_graph = square();
        let tight = CycleSearchParams { max_price_impact: 0.001, ..params(4) };
        assert!(find_cycles(&token_graph, "A", "B", 10.0, &tight, |_| true).is_empty());
    }

    #[test]
    fn test_pool_filter_and_zero_reserve_pools() {
        let mut pools = vec![
            MockPoolBuilder::new("a-b", "A", "B").build(),
            MockPoolBuilder::new("b-c", "B", "C").build(),
            MockPoolBuilder::new("c-a-dead", "C", "A").reserves(0.0, 1000.0).build(),
        ];
        let token_graph = TokenGraph::from_pools(pools.clone());
        assert!(find_cycles(&token_graph, "A", "B", 1.0, &params(3), |_| true).is_empty());

        pools.push(MockPoolBuilder::new("c-a", "C", "A").build());
        let token_graph = TokenGraph::from_pools(pools);
        let cycles = find_cycles(&token_graph, "A", "B", 1.0, &params(3), |_| true);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().all(|cycle| cycle.hops.iter().all(|hop| hop.pool.id != PoolId::from("c-a-dead"))));

        let filtered = find_cycles(&token_graph, "A", "B", 1.0, &params(3), |pool| pool.id != PoolId::from("b-c"));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_iteration_guard() {
        let token_graph = square();
        let limited = CycleSearchParams { max_iterations: 1, ..params(4) };
        // the first frame only expands the start node, nothing can close yet
        assert!(find_cycles(&token_graph, "A", "B", 10.0, &limited, |_| true).is_empty());
    }
}
