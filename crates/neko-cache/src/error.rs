//! Error type shared by every cache operation.

use redis::ErrorKind;

use crate::reply::UnknownReplyKind;

/// Error type for Redis facade operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis pool is not initialized")]
    PoolNotInitialized,

    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid Redis configuration: {0}")]
    Config(#[from] neko_common::ConfigError),

    #[error(transparent)]
    UnknownReplyKind(#[from] UnknownReplyKind),

    #[error("Transaction already committed or aborted")]
    TransactionClosed,
}

impl CacheError {
    /// True when a reply did not match the requested shape
    #[must_use]
    pub fn is_coercion(&self) -> bool {
        matches!(self, Self::Redis(err) if err.kind() == ErrorKind::TypeError)
    }
}

/// Result type for Redis facade operations
pub type CacheResult<T> = Result<T, CacheError>;
