pub mod cycle_search;
pub mod route_hash;
pub mod token_graph;

pub use cycle_search::{CycleCandidate, CycleHop, CycleSearchParams, find_cycles};
pub use route_hash::RouteHash;
pub use token_graph::{FastHashMap, PoolEdge, TokenGraph, TokenNode};
