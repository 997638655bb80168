pub mod mock_pool;
pub mod pool;
pub mod pool_id;

pub use mock_pool::MockPoolBuilder;
pub use pool::{CalculationError, Pool, PoolClass, PoolVariant, SwapQuote, best_pool_for_swap, constant_product_amount_out, pair_key};
pub use pool_id::PoolId;
