use super::pool_id::PoolId;
use crate::utils::constants::{Chain, FEE_DENOMINATOR_PPM, PAIR_KEY_SEPARATOR};
use crate::utils::token::{Token, normalize_symbol};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

#[derive(Copy, Clone, Debug, Display, PartialEq, Hash, Eq, EnumString, VariantNames, Default, Deserialize, Serialize, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolClass {
    #[default]
    ConstantProduct,
    ConcentratedLiquidity,
}

/// Pricing model of a pool. Every variant is currently quoted with the constant-product
/// approximation; a tick-accurate quote can be added per variant without touching callers.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolVariant {
    #[default]
    ConstantProduct,
    ConcentratedLiquidity {
        tick_spacing: i32,
    },
}

impl PoolVariant {
    pub fn class(&self) -> PoolClass {
        match self {
            PoolVariant::ConstantProduct => PoolClass::ConstantProduct,
            PoolVariant::ConcentratedLiquidity { .. } => PoolClass::ConcentratedLiquidity,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("pool {0} has a zero reserve")]
    ZeroReserve(PoolId),
    #[error("token {token} is not traded by pool {pool}")]
    TokenNotInPool { pool: PoolId, token: String },
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
}

/// Result of quoting a single swap against a pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapQuote {
    pub amount_out: f64,
    /// Fractional move of the pool price caused by the trade, `amount_in / (reserve_in + amount_in)`.
    pub price_impact: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub chain: Chain,
    pub dex: String,
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    /// Fee in parts per million.
    pub fee_ppm: u32,
    pub reserve0: f64,
    pub reserve1: f64,
    pub total_supply: f64,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub fees_24h_usd: f64,
    pub is_active: bool,
    /// Unix seconds of the last ingestion update.
    pub last_updated: u64,
    #[serde(default)]
    pub variant: PoolVariant,
}

impl Display for Pool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}({}, fee={})@{}", self.chain, self.dex, self.pair_key(), self.fee_ppm, self.id)
    }
}

impl AsRef<Pool> for Pool {
    fn as_ref(&self) -> &Pool {
        self
    }
}

impl Pool {
    pub fn get_pool_id(&self) -> &PoolId {
        &self.id
    }

    pub fn get_class(&self) -> PoolClass {
        self.variant.class()
    }

    pub fn symbols(&self) -> (&str, &str) {
        (self.token0.get_symbol(), self.token1.get_symbol())
    }

    /// Normalized pair key, e.g. `ETH/USDC`, independent of token order.
    pub fn pair_key(&self) -> String {
        pair_key(self.token0.get_symbol(), self.token1.get_symbol())
    }

    /// Zero-reserve or deactivated pools are excluded from pricing and routing.
    pub fn is_tradeable(&self) -> bool {
        self.is_active && has_liquidity(self.reserve0) && has_liquidity(self.reserve1)
    }

    /// Price of token0 expressed in token1, `reserve1 / reserve0`.
    pub fn price(&self) -> Option<f64> {
        if !has_liquidity(self.reserve0) || !has_liquidity(self.reserve1) {
            return None;
        }
        Some(self.reserve1 / self.reserve0)
    }

    /// Price of the pair key's first symbol expressed in the second one, so pools listing the
    /// same pair in opposite token order quote comparable numbers.
    pub fn price_in_pair_order(&self) -> Option<f64> {
        let price = self.price()?;
        if self.token0.get_symbol() <= self.token1.get_symbol() { Some(price) } else { Some(1.0 / price) }
    }

    /// Converts a price taken from the cache (always `reserve1 / reserve0`) into pair order.
    pub fn orient_price(&self, raw_price: f64) -> f64 {
        if self.token0.get_symbol() <= self.token1.get_symbol() { raw_price } else { 1.0 / raw_price }
    }

    pub fn contains_token(&self, symbol: &str) -> bool {
        self.token0.is_symbol(symbol) || self.token1.is_symbol(symbol)
    }

    pub fn other_token(&self, symbol: &str) -> Option<&Token> {
        if self.token0.is_symbol(symbol) {
            Some(&self.token1)
        } else if self.token1.is_symbol(symbol) {
            Some(&self.token0)
        } else {
            None
        }
    }

    pub fn reserve_of(&self, symbol: &str) -> Option<f64> {
        if self.token0.is_symbol(symbol) {
            Some(self.reserve0)
        } else if self.token1.is_symbol(symbol) {
            Some(self.reserve1)
        } else {
            None
        }
    }

    /// Reserves ordered by the sold token: `(reserve_in, reserve_out)`.
    pub fn reserves_for(&self, token_in: &str) -> Result<(f64, f64), CalculationError> {
        if self.token0.is_symbol(token_in) {
            Ok((self.reserve0, self.reserve1))
        } else if self.token1.is_symbol(token_in) {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(CalculationError::TokenNotInPool { pool: self.id.clone(), token: normalize_symbol(token_in) })
        }
    }

    /// USD value of one unit of `symbol` implied by the pool, assuming both sides hold half
    /// of the pool's USD liquidity.
    pub fn token_usd_price(&self, symbol: &str) -> Option<f64> {
        let reserve = self.reserve_of(symbol)?;
        if !has_liquidity(reserve) || !self.liquidity_usd.is_finite() || self.liquidity_usd <= 0.0 {
            return None;
        }
        Some(self.liquidity_usd / (2.0 * reserve))
    }

    pub fn get_amount_out(&self, token_in: &str, amount_in: f64) -> Result<SwapQuote, CalculationError> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in)?;
        if !has_liquidity(reserve_in) || !has_liquidity(reserve_out) {
            return Err(CalculationError::ZeroReserve(self.id.clone()));
        }
        match self.variant {
            PoolVariant::ConstantProduct | PoolVariant::ConcentratedLiquidity { .. } => {
                let amount_out = constant_product_amount_out(amount_in, reserve_in, reserve_out, self.fee_ppm)
                    .map_err(|e| match e {
                        CalculationError::ZeroReserve(_) => CalculationError::ZeroReserve(self.id.clone()),
                        other => other,
                    })?;
                Ok(SwapQuote { amount_out, price_impact: amount_in / (reserve_in + amount_in) })
            }
        }
    }
}

fn has_liquidity(reserve: f64) -> bool {
    reserve.is_finite() && reserve > 0.0
}

/// Joins two symbols into a key that does not depend on their order.
pub fn pair_key(symbol_a: &str, symbol_b: &str) -> String {
    let a = normalize_symbol(symbol_a);
    let b = normalize_symbol(symbol_b);
    if a <= b { format!("{a}{PAIR_KEY_SEPARATOR}{b}") } else { format!("{b}{PAIR_KEY_SEPARATOR}{a}") }
}

/// `amount_out = reserve_out * amount_in_with_fee / (reserve_in + amount_in_with_fee)`.
pub fn constant_product_amount_out(amount_in: f64, reserve_in: f64, reserve_out: f64, fee_ppm: u32) -> Result<f64, CalculationError> {
    if !amount_in.is_finite() || amount_in < 0.0 {
        return Err(CalculationError::InvalidAmount(amount_in));
    }
    if !has_liquidity(reserve_in) || !has_liquidity(reserve_out) {
        return Err(CalculationError::ZeroReserve(PoolId::default()));
    }
    let fee = (fee_ppm as f64 / FEE_DENOMINATOR_PPM).min(1.0);
    let amount_in_with_fee = amount_in * (1.0 - fee);
    Ok(reserve_out * amount_in_with_fee / (reserve_in + amount_in_with_fee))
}

/// Picks, among `pools`, the one giving the largest output for selling `amount_in` of
/// `token_in`. Pools that cannot quote the swap are ignored. Ties go to the smaller pool id.
pub fn best_pool_for_swap<'a, P, I>(pools: I, token_in: &str, amount_in: f64) -> Option<(&'a P, SwapQuote)>
where
    P: AsRef<Pool> + 'a,
    I: IntoIterator<Item = &'a P>,
{
    pools
        .into_iter()
        .filter(|pool| pool.as_ref().is_tradeable())
        .filter_map(|pool| pool.as_ref().get_amount_out(token_in, amount_in).ok().map(|quote| (pool, quote)))
        .max_by(|(pool_a, quote_a), (pool_b, quote_b)| {
            quote_a
                .amount_out
                .total_cmp(&quote_b.amount_out)
                .then_with(|| pool_b.as_ref().id.cmp(&pool_a.as_ref().id))
        })
}
