use crate::errors::ChainError;
use crate::utils::constants::Chain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Fee market snapshot, all values in wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeData {
    pub gas_price: u128,
    pub max_priority_fee_per_gas: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
}

/// Connection to one chain's node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> Chain;

    async fn get_block_number(&self) -> Result<u64, ChainError>;

    async fn get_fee_data(&self) -> Result<FeeData, ChainError>;
}

/// Deterministic [`ChainClient`] used by tests and the demo. The block number advances by one
/// on every query unless the client is frozen.
#[derive(Debug)]
pub struct SimulatedChainClient {
    chain: Chain,
    block_number: AtomicU64,
    gas_price: AtomicU64,
    auto_advance: AtomicBool,
    failing: AtomicBool,
    latency: Duration,
}

impl SimulatedChainClient {
    pub fn new(chain: Chain, start_block: u64) -> Self {
        Self {
            chain,
            block_number: AtomicU64::new(start_block),
            gas_price: AtomicU64::new(20_000_000_000),
            auto_advance: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_gas_price(self, gas_price_wei: u64) -> Self {
        self.gas_price.store(gas_price_wei, Ordering::Relaxed);
        self
    }

    /// Stops advancing the block number, every query returns the same block.
    pub fn freeze(&self) {
        self.auto_advance.store(false, Ordering::Relaxed);
    }

    pub fn set_block_number(&self, block_number: u64) {
        self.block_number.store(block_number, Ordering::Relaxed);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    async fn simulate_call(&self) -> Result<(), ChainError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(ChainError::Rpc(format!("{} node unavailable", self.chain)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for SimulatedChainClient {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.simulate_call().await?;
        if self.auto_advance.load(Ordering::Relaxed) {
            Ok(self.block_number.fetch_add(1, Ordering::Relaxed))
        } else {
            Ok(self.block_number.load(Ordering::Relaxed))
        }
    }

    async fn get_fee_data(&self) -> Result<FeeData, ChainError> {
        self.simulate_call().await?;
        let gas_price = self.gas_price.load(Ordering::Relaxed) as u128;
        Ok(FeeData { gas_price, max_priority_fee_per_gas: Some(gas_price / 10), max_fee_per_gas: Some(gas_price * 2) })
    }
}
