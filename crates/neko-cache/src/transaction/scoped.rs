//! Scoped `MULTI`/`EXEC` transactions.
//!
//! A `Transaction` owns one connection from `MULTI` until it is committed or
//! aborted. The first failing operation discards the transaction; a
//! transaction dropped while still open retires its connection instead of
//! returning it to the pool in MULTI state.

use futures_util::future::BoxFuture;
use neko_common::TraceId;
use redis::aio::ConnectionLike;
use redis::{Cmd, RedisResult, Value};

use crate::error::{CacheError, CacheResult};
use crate::source::ConnectionSource;

/// One step of a transaction, run against the reserved connection
pub type TransactionOp<C> =
    Box<dyn for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, RedisResult<()>> + Send>;

/// Box a closure as a transaction op
pub fn op<C, F>(f: F) -> TransactionOp<C>
where
    F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, RedisResult<()>> + Send + 'static,
{
    Box::new(f)
}

/// An op that queues `cmd`
pub fn queue<C>(cmd: Cmd) -> TransactionOp<C>
where
    C: ConnectionLike + Send + 'static,
{
    op(move |conn| Box::pin(async move { cmd.query_async::<()>(conn).await }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// `MULTI` sent, commands may be queued
    Open,
    /// `EXEC` sent
    Committed,
    /// `DISCARD` sent, or the transaction was abandoned
    Aborted,
}

/// A transaction holding a reserved connection
pub struct Transaction<S: ConnectionSource> {
    conn: Option<S::Connection>,
    state: TransactionState,
    queued: usize,
    trace_id: TraceId,
}

impl<S: ConnectionSource> std::fmt::Debug for Transaction<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .field("queued", &self.queued)
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

impl<S: ConnectionSource> Transaction<S> {
    /// Acquire a connection from `source` and send `MULTI`
    pub(crate) async fn begin(source: &S) -> CacheResult<Self> {
        let trace_id = TraceId::generate();
        let mut conn = source.acquire().await?;

        if let Err(err) = redis::cmd("MULTI").query_async::<()>(&mut conn).await {
            tracing::error!(%trace_id, error = %err, "Redis MULTI failed");
            S::retire(conn);
            return Err(err.into());
        }

        tracing::debug!(%trace_id, "Redis transaction started");
        Ok(Self {
            conn: Some(conn),
            state: TransactionState::Open,
            queued: 0,
            trace_id,
        })
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Number of operations queued so far
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued
    }

    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Queue `cmd`; on failure the transaction is discarded
    pub async fn enqueue(&mut self, cmd: &Cmd) -> CacheResult<()> {
        let conn = self.open_connection()?;
        let outcome = cmd.query_async::<()>(conn).await;
        self.settle(outcome).await
    }

    /// Run `op` against the reserved connection; on failure the transaction
    /// is discarded and `op`'s error returned
    pub async fn enqueue_with<F>(&mut self, op: F) -> CacheResult<()>
    where
        F: for<'c> FnOnce(&'c mut S::Connection) -> BoxFuture<'c, RedisResult<()>>,
    {
        let conn = self.open_connection()?;
        let outcome = op(conn).await;
        self.settle(outcome).await
    }

    /// Send `EXEC` and return its reply (one entry per queued command).
    ///
    /// Only a failure of `EXEC` itself is an error. A queued command that
    /// fails while executing leaves its error in the reply array, and the
    /// other commands stay applied.
    pub async fn commit(mut self) -> CacheResult<Value> {
        let conn = self.open_connection()?;
        let result = conn
            .req_packed_command(&redis::cmd("EXEC"))
            .await
            .and_then(|reply| match reply {
                Value::ServerError(err) => Err(err.into()),
                reply => Ok(reply),
            });
        self.state = TransactionState::Committed;

        match result {
            Ok(reply) => {
                self.conn = None;
                tracing::debug!(trace_id = %self.trace_id, queued = self.queued, "Redis transaction executed");
                Ok(reply)
            }
            Err(err) => {
                if let Some(conn) = self.conn.take() {
                    if err.is_io_error() || err.is_connection_dropped() {
                        S::retire(conn);
                    }
                }
                tracing::error!(trace_id = %self.trace_id, error = %err, "Redis EXEC failed");
                Err(err.into())
            }
        }
    }

    /// Send `DISCARD`, dropping every queued command
    pub async fn abort(mut self) -> CacheResult<()> {
        self.open_connection()?;
        self.state = TransactionState::Aborted;
        let Some(mut conn) = self.conn.take() else {
            return Err(CacheError::TransactionClosed);
        };

        let result = redis::cmd("DISCARD").query_async::<()>(&mut conn).await;
        if result.is_err() {
            S::retire(conn);
        }
        tracing::debug!(trace_id = %self.trace_id, queued = self.queued, "Redis transaction aborted");
        Ok(result?)
    }

    fn open_connection(&mut self) -> CacheResult<&mut S::Connection> {
        if self.state != TransactionState::Open {
            return Err(CacheError::TransactionClosed);
        }
        self.conn.as_mut().ok_or(CacheError::TransactionClosed)
    }

    async fn settle(&mut self, outcome: RedisResult<()>) -> CacheResult<()> {
        match outcome {
            Ok(()) => {
                self.queued += 1;
                Ok(())
            }
            Err(err) => {
                self.discard().await;
                Err(err.into())
            }
        }
    }

    async fn discard(&mut self) {
        self.state = TransactionState::Aborted;
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        match redis::cmd("DISCARD").query_async::<()>(&mut conn).await {
            Ok(()) => tracing::debug!(
                trace_id = %self.trace_id,
                queued = self.queued,
                "Redis transaction discarded"
            ),
            Err(err) => {
                tracing::warn!(
                    trace_id = %self.trace_id,
                    error = %err,
                    "Redis DISCARD failed; retiring connection"
                );
                S::retire(conn);
            }
        }
    }
}

impl<S: ConnectionSource> Drop for Transaction<S> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(
                trace_id = %self.trace_id,
                queued = self.queued,
                "Redis transaction dropped while open; retiring connection"
            );
            S::retire(conn);
        }
    }
}
