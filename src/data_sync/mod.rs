/// Data Layer
///
/// Everything that talks to the outside world or runs on a timer:
/// - pool repository contract and its in-memory implementation
/// - chain clients (block number, fee data)
/// - per-chain price observation with a short-lived price cache
/// - busy-guarded scheduled tasks and the service wiring them together
pub mod chain_client;
pub mod config;
pub mod price_observer;
pub mod repository;
pub mod scheduler;
pub mod service;


pub use chain_client::{ChainClient, FeeData, SimulatedChainClient};
pub use config::{ArbitrageConfig, ObserverConfig};
pub use price_observer::{ObservationReport, PriceCache, PriceObserver};
pub use repository::{InMemoryPoolRepository, PoolRepository};
pub use scheduler::{ScheduledTask, TaskStats, TaskStatsSnapshot};
pub use service::{ArbitrageService, ArbitrageServiceBuilder, ServiceStats};
