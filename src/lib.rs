// Three-Layer Architecture
pub mod data_sync; // Data Layer: repository, chain clients, price observation, scheduling
pub mod logic; // Logic Layer: opportunity detection, token graph, route search

pub mod errors;
// Common utilities and types
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{
    ArbitrageConfig, ArbitrageService, ArbitrageServiceBuilder, ChainClient, FeeData, InMemoryPoolRepository, ObserverConfig, PoolRepository, PriceCache,
    PriceObserver, ScheduledTask, SimulatedChainClient,
};
pub use errors::{ChainError, RepositoryError};
pub use logic::{
    ArbitrageOpportunity, ArbitrageRoute, ArbitrageRouteFinder, ArbitrageRouteFinderBuilder, CalculationError, DetectorConfig, ExecutionComplexity, GasCostTable,
    MockPoolBuilder, OpportunityDetector, OpportunityStatus, Pool, PoolClass, PoolId, PoolVariant, PricePoint, RouteConstraints, RouteHash, RouteSearchConfig,
    RouteStep, RouteStrategy, SwapQuote, TokenGraph,
};
pub use utils::{CacheStats, Chain, Token, TokenWrapper, TtlCache};
