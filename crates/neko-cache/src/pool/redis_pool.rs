//! Redis connection pool using deadpool-redis.
//!
//! Provides a managed pool of Redis connections for efficient resource usage.

use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use neko_common::RedisConfig;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use crate::error::{CacheError, CacheResult};
use crate::source::ConnectionSource;

/// Redis pool configuration
#[derive(Clone)]
pub struct RedisPoolConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Maximum number of connections in the pool (0 uses deadpool's default)
    pub max_active: usize,
    /// Maximum number of idle connections kept between calls
    pub max_idle: usize,
    /// Idle connections unused for longer than this are dropped
    pub idle_timeout: Option<Duration>,
    /// How long `get` waits on an exhausted pool (`None` waits forever)
    pub wait_timeout: Option<Duration>,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            max_active: 0,
            max_idle: 8,
            idle_timeout: None,
            wait_timeout: None,
        }
    }
}

impl std::fmt::Debug for RedisPoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPoolConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("max_active", &self.max_active)
            .field("max_idle", &self.max_idle)
            .field("idle_timeout", &self.idle_timeout)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}

impl TryFrom<&RedisConfig> for RedisPoolConfig {
    type Error = CacheError;

    fn try_from(config: &RedisConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            host: config.ip.clone(),
            port: config.port_number()?,
            password: config.password().map(str::to_string),
            max_active: config.max_active,
            max_idle: config.max_idle,
            idle_timeout: config.idle_timeout(),
            wait_timeout: config.wait_timeout(),
        })
    }
}

impl RedisPoolConfig {
    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }

    fn max_size(&self) -> usize {
        if self.max_active == 0 {
            PoolConfig::default().max_size
        } else {
            self.max_active
        }
    }
}

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
    max_idle: usize,
    idle_timeout: Option<Duration>,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .field("max_idle", &self.max_idle)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl RedisPool {
    /// Create a new Redis pool with the given configuration
    ///
    /// No connection is opened until the first `get`.
    pub fn new(config: RedisPoolConfig) -> CacheResult<Self> {
        let max_size = config.max_size();
        let pool = Config::from_connection_info(config.connection_info())
            .builder()
            .map_err(|e| CacheError::CreatePool(e.to_string()))?
            .max_size(max_size)
            .wait_timeout(config.wait_timeout)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::CreatePool(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            max_size,
            max_idle = config.max_idle,
            idle_timeout = ?config.idle_timeout,
            "Redis pool created"
        );

        Ok(Self {
            pool,
            max_idle: config.max_idle,
            idle_timeout: config.idle_timeout,
        })
    }

    /// Create a pool from application config
    ///
    /// Returns `Ok(None)` when the config has `enable: false`.
    pub fn from_config(config: &RedisConfig) -> CacheResult<Option<Self>> {
        if !config.enable {
            tracing::debug!("Redis disabled by configuration; no pool created");
            return Ok(None);
        }
        Self::new(RedisPoolConfig::try_from(config)?).map(Some)
    }

    /// Get a connection from the pool
    pub async fn get(&self) -> CacheResult<Connection> {
        self.prune_idle();
        self.pool.get().await.map_err(CacheError::GetConnection)
    }

    /// Get the current pool status
    #[must_use]
    pub fn status(&self) -> deadpool_redis::Status {
        self.pool.status()
    }

    /// Check if the pool is healthy by pinging Redis
    pub async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.get().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await?;
        Ok(())
    }

    /// Drop idle connections past the idle timeout and any beyond `max_idle`.
    ///
    /// Returns the number of connections removed.
    pub fn prune_idle(&self) -> usize {
        let kept = Cell::new(0usize);
        let removed = Cell::new(0usize);

        self.pool.retain(|_, metrics| {
            let fresh = self
                .idle_timeout
                .map_or(true, |timeout| metrics.last_used() < timeout);
            let keep = fresh && kept.get() < self.max_idle;
            if keep {
                kept.set(kept.get() + 1);
            } else {
                removed.set(removed.get() + 1);
            }
            keep
        });

        let removed = removed.get();
        if removed > 0 {
            tracing::debug!(removed, "Pruned idle Redis connections");
        }
        removed
    }
}

#[async_trait]
impl ConnectionSource for RedisPool {
    type Connection = Connection;

    async fn acquire(&self) -> CacheResult<Connection> {
        self.get().await
    }

    fn retire(conn: Connection) {
        drop(Connection::take(conn));
    }
}

/// Shared Redis pool wrapped in Arc for easy cloning
pub type SharedRedisPool = Arc<RedisPool>;

/// Create a shared Redis pool
pub fn create_shared_pool(config: RedisPoolConfig) -> CacheResult<SharedRedisPool> {
    Ok(Arc::new(RedisPool::new(config)?))
}

/// Build the pool if enabled, logging instead of failing.
///
/// Disabled configs yield `None` silently; construction failures are logged at
/// error level and also yield `None`. A facade built over the result reports
/// `PoolNotInitialized` for every call in both cases.
pub fn init_pool(config: &RedisConfig) -> Option<RedisPool> {
    match RedisPool::from_config(config) {
        Ok(Some(pool)) => {
            tracing::info!(config = ?config, "Redis pool initialized");
            Some(pool)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::error!(config = ?config, error = %err, "Redis pool failed to initialize");
            None
        }
    }
}
