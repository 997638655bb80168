use super::pool::{Pool, PoolVariant};
use super::pool_id::PoolId;
use crate::utils::constants::Chain;
use crate::utils::token::Token;
use alloy_primitives::Address;

/// Builds [`Pool`] fixtures for tests, benches and demos.
#[derive(Clone, Debug)]
pub struct MockPoolBuilder {
    pool: Pool,
}

impl MockPoolBuilder {
    pub fn new(id: &str, symbol0: &str, symbol1: &str) -> Self {
        let pool = Pool {
            id: PoolId::from(id),
            chain: Chain::Ethereum,
            dex: "uniswap-v2".to_string(),
            address: Address::random(),
            token0: Token::random(symbol0),
            token1: Token::random(symbol1),
            fee_ppm: 3000,
            reserve0: 1_000.0,
            reserve1: 1_000.0,
            total_supply: 1_000.0,
            liquidity_usd: 1_000_000.0,
            volume_24h_usd: 0.0,
            fees_24h_usd: 0.0,
            is_active: true,
            last_updated: 0,
            variant: PoolVariant::ConstantProduct,
        };
        Self { pool }
    }

    pub fn chain(mut self, chain: Chain) -> Self {
        self.pool.chain = chain;
        self
    }

    pub fn dex(mut self, dex: &str) -> Self {
        self.pool.dex = dex.to_string();
        self
    }

    pub fn reserves(mut self, reserve0: f64, reserve1: f64) -> Self {
        self.pool.reserve0 = reserve0;
        self.pool.reserve1 = reserve1;
        self
    }

    pub fn fee_ppm(mut self, fee_ppm: u32) -> Self {
        self.pool.fee_ppm = fee_ppm;
        self
    }

    pub fn liquidity_usd(mut self, liquidity_usd: f64) -> Self {
        self.pool.liquidity_usd = liquidity_usd;
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.pool.is_active = is_active;
        self
    }

    pub fn variant(mut self, variant: PoolVariant) -> Self {
        self.pool.variant = variant;
        self
    }

    pub fn build(self) -> Pool {
        self.pool
    }
}
