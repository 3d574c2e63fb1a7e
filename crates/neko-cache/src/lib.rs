//! # neko-cache
//!
//! A typed command facade over a pooled Redis connection.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Command Facade**: bound commands (`Do`), typed loads (`Load`) and `EXISTS`
//! - **Reply Coercion**: closed set of reply shapes, each with its own conversion
//! - **Transactions**: scoped `MULTI`/`EXEC`/`DISCARD` over one reserved connection
//!
//! ## Example
//!
//! ```ignore
//! use neko_cache::{queue, RedisFacade, Reply, ReplyKind};
//! use neko_common::AppConfig;
//!
//! let config = AppConfig::load("config/app.yaml")?;
//! let redis = RedisFacade::from_config(&config.redis);
//!
//! redis.command("SET").call(("greeting", "hello")).await?;
//! let reply = redis.loader(ReplyKind::String, "GET").load("greeting").await?;
//! assert_eq!(reply, Reply::String("hello".into()));
//!
//! let mut incr = redis::cmd("INCR");
//! incr.arg("visits");
//! redis.run_transaction(vec![queue(incr)]).await?;
//! ```

pub mod error;
pub mod facade;
pub mod pool;
pub mod reply;
pub mod source;
pub mod transaction;

#[cfg(test)]
mod testing;

pub use error::{CacheError, CacheResult};
pub use facade::{BoundCommand, Loader, RedisFacade};
pub use pool::{create_shared_pool, init_pool, RedisPool, RedisPoolConfig, SharedRedisPool};
pub use reply::{Reply, ReplyKind, UnknownReplyKind};
pub use source::ConnectionSource;
pub use transaction::{op, queue, Transaction, TransactionOp, TransactionState};
