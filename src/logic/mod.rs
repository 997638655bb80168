/// Logic Layer
///
/// Pure arbitrage computation over pool snapshots:
/// - two-pool spread detection on cached prices
/// - token multigraph and explicit-stack cycle search
/// - route scoring, ranking and the route cache
pub mod gas;
pub mod graph;
pub mod opportunity_detector;
pub mod pools;
pub mod route_search;
pub mod scoring;
pub mod types;

pub use gas::GasCostTable;
pub use graph::{RouteHash, TokenGraph};
pub use opportunity_detector::{DetectionReport, OpportunityDetector, PairEvaluation};
pub use pools::{CalculationError, MockPoolBuilder, Pool, PoolClass, PoolId, PoolVariant, SwapQuote};
pub use route_search::{ArbitrageRouteFinder, ArbitrageRouteFinderBuilder, RouteFinderStats};
pub use types::{
    ArbitrageOpportunity, ArbitrageRoute, DetectorConfig, ExecutionComplexity, OpportunityStatus, PricePoint, RouteConstraints, RouteSearchConfig, RouteStep,
    RouteStrategy,
};
