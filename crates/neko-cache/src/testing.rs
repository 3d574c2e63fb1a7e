//! In-memory connection source for unit tests.
//!
//! Understands enough of the command set to exercise the facade (strings,
//! EXISTS, DEL, INCR, MULTI/EXEC/DISCARD) and records every command it sees.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionLike;
use redis::{Arg, Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, RedisResult, Value};

use crate::error::{CacheError, CacheResult};
use crate::source::ConnectionSource;

#[derive(Debug, Default)]
struct MockState {
    data: HashMap<Vec<u8>, Vec<u8>>,
    log: Vec<String>,
    failing: HashSet<String>,
    replies: HashMap<String, Value>,
    unavailable: bool,
    acquired: usize,
    released: usize,
    retired: usize,
}

fn command_name(parts: &[Vec<u8>]) -> String {
    parts
        .first()
        .map(|name| String::from_utf8_lossy(name).to_ascii_uppercase())
        .unwrap_or_default()
}

fn response_error(msg: &'static str) -> RedisError {
    RedisError::from((ErrorKind::ResponseError, msg))
}

/// The error as the server embeds it in an `EXEC` reply
fn error_reply(err: &RedisError) -> RedisResult<Value> {
    redis::parse_redis_value(format!("-ERR {err}\r\n").as_bytes())
}

impl MockState {
    fn apply(&mut self, parts: &[Vec<u8>]) -> RedisResult<Value> {
        let name = command_name(parts);
        if let Some(reply) = self.replies.get(&name) {
            return Ok(reply.clone());
        }

        let args = &parts[1..];
        match (name.as_str(), args) {
            ("PING", _) => Ok(Value::SimpleString("PONG".to_string())),
            ("SET", [key, value, ..]) => {
                self.data.insert(key.clone(), value.clone());
                Ok(Value::Okay)
            }
            ("GET", [key]) => Ok(self
                .data
                .get(key)
                .map_or(Value::Nil, |v| Value::BulkString(v.clone()))),
            ("EXISTS", keys) if !keys.is_empty() => {
                let count = keys.iter().filter(|k| self.data.contains_key(*k)).count();
                Ok(Value::Int(count as i64))
            }
            ("DEL", keys) if !keys.is_empty() => {
                let count = keys.iter().filter(|k| self.data.remove(*k).is_some()).count();
                Ok(Value::Int(count as i64))
            }
            ("INCR", [key]) => {
                let current = match self.data.get(key) {
                    Some(raw) => String::from_utf8_lossy(raw)
                        .parse::<i64>()
                        .map_err(|_| response_error("value is not an integer"))?,
                    None => 0,
                };
                let next = current + 1;
                self.data.insert(key.clone(), next.to_string().into_bytes());
                Ok(Value::Int(next))
            }
            ("SET" | "GET" | "EXISTS" | "DEL" | "INCR", _) => {
                Err(response_error("wrong number of arguments"))
            }
            _ => Err(response_error("unknown command")),
        }
    }
}

/// Shared handle to the fake server; clones observe the same state
#[derive(Clone, Default)]
pub(crate) struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every future `command` fail with an I/O error
    pub(crate) fn fail_on(&self, command: &str) {
        self.state.lock().failing.insert(command.to_ascii_uppercase());
    }

    /// Answer `command` with a fixed reply
    pub(crate) fn reply_with(&self, command: &str, reply: Value) {
        self.state
            .lock()
            .replies
            .insert(command.to_ascii_uppercase(), reply);
    }

    /// Refuse to hand out connections
    pub(crate) fn set_unavailable(&self) {
        self.state.lock().unavailable = true;
    }

    /// Every command seen so far, rendered as `NAME arg arg`
    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// How many times `command` was issued
    pub(crate) fn count(&self, command: &str) -> usize {
        let command = command.to_ascii_uppercase();
        self.state
            .lock()
            .log
            .iter()
            .filter(|line| line.split(' ').next() == Some(command.as_str()))
            .count()
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .data
            .get(key.as_bytes())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    pub(crate) fn acquired(&self) -> usize {
        self.state.lock().acquired
    }

    pub(crate) fn released(&self) -> usize {
        self.state.lock().released
    }

    pub(crate) fn retired(&self) -> usize {
        self.state.lock().retired
    }
}

#[async_trait]
impl ConnectionSource for MockSource {
    type Connection = MockConnection;

    async fn acquire(&self) -> CacheResult<MockConnection> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(CacheError::Redis(RedisError::from((
                ErrorKind::IoError,
                "connection refused",
            ))));
        }
        state.acquired += 1;
        Ok(MockConnection {
            state: Arc::clone(&self.state),
            queued: None,
        })
    }

    fn retire(conn: MockConnection) {
        conn.state.lock().retired += 1;
    }
}

/// One fake connection; owns its MULTI queue
pub(crate) struct MockConnection {
    state: Arc<Mutex<MockState>>,
    queued: Option<Vec<Vec<Vec<u8>>>>,
}

impl MockConnection {
    fn handle(&mut self, cmd: &Cmd) -> RedisResult<Value> {
        let parts: Vec<Vec<u8>> = cmd
            .args_iter()
            .map(|arg| match arg {
                Arg::Simple(bytes) => bytes.to_vec(),
                Arg::Cursor => b"0".to_vec(),
            })
            .collect();
        let name = command_name(&parts);

        let mut state = self.state.lock();
        state.log.push(
            parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join(" "),
        );
        if state.failing.contains(&name) {
            return Err(RedisError::from((ErrorKind::IoError, "mock connection failure")));
        }

        let in_multi = self.queued.is_some();
        match name.as_str() {
            "MULTI" if in_multi => Err(response_error("MULTI calls can not be nested")),
            "MULTI" => {
                self.queued = Some(Vec::new());
                Ok(Value::Okay)
            }
            "EXEC" | "DISCARD" if !in_multi => Err(response_error("command without MULTI")),
            "EXEC" => {
                let queued = self.queued.take().unwrap_or_default();
                if let Some(reply) = state.replies.get("EXEC") {
                    return Ok(reply.clone());
                }
                let results = queued
                    .iter()
                    .map(|parts| state.apply(parts).or_else(|err| error_reply(&err)))
                    .collect::<RedisResult<Vec<_>>>()?;
                Ok(Value::Array(results))
            }
            "DISCARD" => {
                self.queued = None;
                Ok(Value::Okay)
            }
            _ => match self.queued.as_mut() {
                Some(queue) => {
                    queue.push(parts);
                    Ok(Value::SimpleString("QUEUED".to_string()))
                }
                None => state.apply(&parts),
            },
        }
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.state.lock().released += 1;
    }
}

impl ConnectionLike for MockConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        let result = self.handle(cmd);
        Box::pin(async move { result })
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        _pipeline: &'a Pipeline,
        _offset: usize,
        _count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        Box::pin(async {
            Err(RedisError::from((
                ErrorKind::ClientError,
                "pipelines are not supported by the mock",
            )))
        })
    }

    fn get_db(&self) -> i64 {
        0
    }
}
