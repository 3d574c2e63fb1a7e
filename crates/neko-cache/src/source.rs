//! Connection sources.
//!
//! The facade never reaches for a global pool; it is handed something that can
//! produce connections. `RedisPool` is the production source, `Option<S>`
//! models a pool that may be absent, and tests plug in an in-memory double.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionLike;

use crate::error::{CacheError, CacheResult};

/// Something that hands out Redis connections
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Connection type; returned to its origin when dropped
    type Connection: ConnectionLike + Send + 'static;

    /// Acquire a connection, waiting if the source is exhausted
    async fn acquire(&self) -> CacheResult<Self::Connection>;

    /// Dispose of a connection whose protocol state is unknown so it is never
    /// handed out again.
    fn retire(conn: Self::Connection) {
        drop(conn);
    }
}

#[async_trait]
impl<S: ConnectionSource> ConnectionSource for Option<S> {
    type Connection = S::Connection;

    async fn acquire(&self) -> CacheResult<Self::Connection> {
        match self {
            Some(source) => source.acquire().await,
            None => Err(CacheError::PoolNotInitialized),
        }
    }

    fn retire(conn: Self::Connection) {
        S::retire(conn);
    }
}

#[async_trait]
impl<S: ConnectionSource> ConnectionSource for Arc<S> {
    type Connection = S::Connection;

    async fn acquire(&self) -> CacheResult<Self::Connection> {
        self.as_ref().acquire().await
    }

    fn retire(conn: Self::Connection) {
        S::retire(conn);
    }
}
