//! Command facade over a connection source.
//!
//! Every call acquires its own connection, issues one command, releases the
//! connection and emits one log event tagged with a fresh trace id. Errors
//! from the pool or the server are returned unchanged; nothing is retried.

use std::fmt;

use neko_common::{RedisConfig, TraceId};
use redis::{Cmd, FromRedisValue, ToRedisArgs, Value};
use tracing::Instrument;

use super::render::render_command;
use crate::error::CacheResult;
use crate::pool::{init_pool, RedisPool};
use crate::reply::{Reply, ReplyKind};
use crate::source::ConnectionSource;
use crate::transaction::{Transaction, TransactionOp};

/// Typed command dispatch over pooled connections
#[derive(Debug, Clone)]
pub struct RedisFacade<S = Option<RedisPool>> {
    source: S,
}

impl<S> RedisFacade<S> {
    /// Create a facade over an explicit connection source
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The underlying connection source
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl RedisFacade<Option<RedisPool>> {
    /// Build the pool described by `config` and wrap it.
    ///
    /// Never fails: a disabled or unbuildable pool yields a facade whose
    /// calls all return `PoolNotInitialized`.
    #[must_use]
    pub fn from_config(config: &RedisConfig) -> Self {
        Self::new(init_pool(config))
    }

    /// Whether a pool backs this facade
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.source.is_some()
    }
}

impl<S: ConnectionSource> RedisFacade<S> {
    /// Bind a command name; each `call` on the result issues it once
    pub fn command(&self, name: impl Into<String>) -> BoundCommand<'_, S> {
        BoundCommand {
            facade: self,
            name: name.into(),
        }
    }

    /// Bind a command name and a reply shape; each `load` issues it once
    pub fn loader(&self, kind: ReplyKind, name: impl Into<String>) -> Loader<'_, S> {
        Loader {
            facade: self,
            kind,
            name: name.into(),
        }
    }

    /// Issue `name` with `args` and return the raw reply
    pub async fn execute(&self, name: &str, args: impl ToRedisArgs) -> CacheResult<Value> {
        let mut cmd = redis::cmd(name);
        cmd.arg(args);
        self.run("do", &cmd, Ok).await
    }

    /// Issue `name` with `args` and convert the reply with `FromRedisValue`
    pub async fn query<T>(&self, name: &str, args: impl ToRedisArgs) -> CacheResult<T>
    where
        T: FromRedisValue + fmt::Debug,
    {
        let mut cmd = redis::cmd(name);
        cmd.arg(args);
        self.run("query", &cmd, |value| Ok(T::from_owned_redis_value(value)?))
            .await
    }

    /// Issue `name` with `key` and coerce the reply into `kind`
    pub async fn load(
        &self,
        kind: ReplyKind,
        name: &str,
        key: impl ToRedisArgs,
    ) -> CacheResult<Reply> {
        let mut cmd = redis::cmd(name);
        cmd.arg(key);
        self.run("load", &cmd, |value| Ok(kind.coerce(value)?)).await
    }

    /// True iff `EXISTS key` replies with exactly 1
    pub async fn exists(&self, key: impl ToRedisArgs) -> CacheResult<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        self.run("exists", &cmd, |value| {
            Ok(i64::from_owned_redis_value(value)? == 1)
        })
        .await
    }

    /// Reserve a connection and send `MULTI`
    pub async fn transaction(&self) -> CacheResult<Transaction<S>> {
        Transaction::begin(&self.source).await
    }

    /// Run `ops` inside one `MULTI`/`EXEC` block.
    ///
    /// The first failing op stops the sequence: `DISCARD` is sent and that
    /// op's error is returned. Otherwise `EXEC` is sent once and its reply
    /// returned. Aborted transactions are not retried.
    pub async fn run_transaction<I>(&self, ops: I) -> CacheResult<Value>
    where
        I: IntoIterator<Item = TransactionOp<S::Connection>>,
    {
        let mut tx = self.transaction().await?;
        let trace_id = tx.trace_id();

        let mut outcome = Ok(());
        for op in ops {
            outcome = tx.enqueue_with(op).await;
            if outcome.is_err() {
                break;
            }
        }

        let queued = tx.queued();
        let result = match outcome {
            Ok(()) => tx.commit().await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(reply) => tracing::info!(
                %trace_id,
                queued,
                reply = ?reply,
                "Redis transaction committed"
            ),
            Err(err) => tracing::error!(
                %trace_id,
                queued,
                error = %err,
                "Redis transaction failed"
            ),
        }
        result
    }

    async fn run<T, F>(&self, op: &'static str, cmd: &Cmd, convert: F) -> CacheResult<T>
    where
        T: fmt::Debug,
        F: FnOnce(Value) -> CacheResult<T>,
    {
        let trace_id = TraceId::generate();
        let span = tracing::info_span!("redis", %trace_id, op);

        let result = async {
            let mut conn = self.source.acquire().await?;
            let value = cmd.query_async::<Value>(&mut conn).await?;
            convert(value)
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| {
            let command = render_command(cmd);
            match &result {
                Ok(reply) => tracing::info!(%command, reply = ?reply, "Redis command completed"),
                Err(err) => tracing::error!(%command, error = %err, "Redis command failed"),
            }
        });
        result
    }
}

/// A command name bound to a facade
pub struct BoundCommand<'f, S> {
    facade: &'f RedisFacade<S>,
    name: String,
}

impl<S: ConnectionSource> BoundCommand<'_, S> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Issue the command with `args`
    pub async fn call(&self, args: impl ToRedisArgs) -> CacheResult<Value> {
        self.facade.execute(&self.name, args).await
    }
}

/// A command name and reply shape bound to a facade
pub struct Loader<'f, S> {
    facade: &'f RedisFacade<S>,
    kind: ReplyKind,
    name: String,
}

impl<S: ConnectionSource> Loader<'_, S> {
    #[must_use]
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    /// Issue the command for `key` and coerce the reply
    pub async fn load(&self, key: impl ToRedisArgs) -> CacheResult<Reply> {
        self.facade.load(self.kind, &self.name, key).await
    }
}
