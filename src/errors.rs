use crate::logic::pools::PoolId;

/// Failures reported by a [`PoolRepository`](crate::data_sync::PoolRepository).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository not initialized")]
    NotInitialized,
    #[error("pool not found: {0}")]
    PoolNotFound(PoolId),
    #[error("opportunity not found: {0}")]
    OpportunityNotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Failures reported by a [`ChainClient`](crate::data_sync::ChainClient).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("request timed out")]
    Timeout,
}
