//! Reply shapes and their coercions.
//!
//! Each `ReplyKind` names one target shape and knows how to convert a raw
//! `redis::Value` into it. Conversion failures are the driver's own type
//! errors, so callers see the same error whether they use a kind or a
//! `FromRedisValue` type directly.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use redis::{ErrorKind, FromRedisValue, RedisError, RedisResult, Value};

/// Target shape for a typed load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// No coercion; the reply is returned as received
    Raw,
    String,
    Int,
    Int64,
    Uint64,
    Float64,
    Bool,
    Bytes,
    StringMap,
    StringSlice,
    IntSlice,
    Int64Slice,
    Uint64Slice,
    Float64Slice,
    BytesSlice,
    IntMap,
    Int64Map,
    Uint64Map,
    Float64Map,
}

/// A reply coerced into the shape selected by a `ReplyKind`
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Raw(Value),
    String(String),
    Int(isize),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    StringMap(HashMap<String, String>),
    StringSlice(Vec<String>),
    IntSlice(Vec<isize>),
    Int64Slice(Vec<i64>),
    Uint64Slice(Vec<u64>),
    Float64Slice(Vec<f64>),
    BytesSlice(Vec<Vec<u8>>),
    IntMap(HashMap<String, isize>),
    Int64Map(HashMap<String, i64>),
    Uint64Map(HashMap<String, u64>),
    Float64Map(HashMap<String, f64>),
}

impl ReplyKind {
    /// Every kind, in declaration order
    pub const ALL: [ReplyKind; 19] = [
        Self::Raw,
        Self::String,
        Self::Int,
        Self::Int64,
        Self::Uint64,
        Self::Float64,
        Self::Bool,
        Self::Bytes,
        Self::StringMap,
        Self::StringSlice,
        Self::IntSlice,
        Self::Int64Slice,
        Self::Uint64Slice,
        Self::Float64Slice,
        Self::BytesSlice,
        Self::IntMap,
        Self::Int64Map,
        Self::Uint64Map,
        Self::Float64Map,
    ];

    /// Convert a raw reply into this shape.
    ///
    /// A nil reply only converts to `Raw`; every other kind rejects it
    /// rather than producing an empty or zero value.
    pub fn coerce(self, value: Value) -> RedisResult<Reply> {
        if matches!(value, Value::Nil) && self != Self::Raw {
            return Err(RedisError::from((
                ErrorKind::TypeError,
                "Response was nil",
                format!("cannot coerce nil into {self}"),
            )));
        }

        Ok(match self {
            Self::Raw => Reply::Raw(value),
            Self::String => Reply::String(from_value(value)?),
            Self::Int => Reply::Int(from_value(value)?),
            Self::Int64 => Reply::Int64(from_value(value)?),
            Self::Uint64 => Reply::Uint64(from_value(value)?),
            Self::Float64 => Reply::Float64(from_value(value)?),
            Self::Bool => Reply::Bool(from_value(value)?),
            Self::Bytes => Reply::Bytes(from_value(value)?),
            Self::StringMap => Reply::StringMap(from_value(value)?),
            Self::StringSlice => Reply::StringSlice(from_value(value)?),
            Self::IntSlice => Reply::IntSlice(from_value(value)?),
            Self::Int64Slice => Reply::Int64Slice(from_value(value)?),
            Self::Uint64Slice => Reply::Uint64Slice(from_value(value)?),
            Self::Float64Slice => Reply::Float64Slice(from_value(value)?),
            Self::BytesSlice => Reply::BytesSlice(from_value(value)?),
            Self::IntMap => Reply::IntMap(from_value(value)?),
            Self::Int64Map => Reply::Int64Map(from_value(value)?),
            Self::Uint64Map => Reply::Uint64Map(from_value(value)?),
            Self::Float64Map => Reply::Float64Map(from_value(value)?),
        })
    }

    /// Canonical tag for this kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::String => "string",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::StringMap => "stringMap",
            Self::StringSlice => "stringSlice",
            Self::IntSlice => "intSlice",
            Self::Int64Slice => "int64Slice",
            Self::Uint64Slice => "uint64Slice",
            Self::Float64Slice => "float64Slice",
            Self::BytesSlice => "bytesSlice",
            Self::IntMap => "intMap",
            Self::Int64Map => "int64Map",
            Self::Uint64Map => "uint64Map",
            Self::Float64Map => "float64Map",
        }
    }
}

fn from_value<T: FromRedisValue>(value: Value) -> RedisResult<T> {
    T::from_owned_redis_value(value)
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag that names no known reply kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reply kind: {0}")]
pub struct UnknownReplyKind(pub String);

impl FromStr for ReplyKind {
    type Err = UnknownReplyKind;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = Self::ALL.into_iter().find(|kind| kind.as_str() == tag) {
            return Ok(kind);
        }
        // Legacy aliases
        match tag {
            "stringSliceMap" => Ok(Self::StringMap),
            "bytesSliceSlice" => Ok(Self::BytesSlice),
            _ => Err(UnknownReplyKind(tag.to_string())),
        }
    }
}

impl Reply {
    /// The kind this reply was coerced with
    #[must_use]
    pub fn kind(&self) -> ReplyKind {
        match self {
            Self::Raw(_) => ReplyKind::Raw,
            Self::String(_) => ReplyKind::String,
            Self::Int(_) => ReplyKind::Int,
            Self::Int64(_) => ReplyKind::Int64,
            Self::Uint64(_) => ReplyKind::Uint64,
            Self::Float64(_) => ReplyKind::Float64,
            Self::Bool(_) => ReplyKind::Bool,
            Self::Bytes(_) => ReplyKind::Bytes,
            Self::StringMap(_) => ReplyKind::StringMap,
            Self::StringSlice(_) => ReplyKind::StringSlice,
            Self::IntSlice(_) => ReplyKind::IntSlice,
            Self::Int64Slice(_) => ReplyKind::Int64Slice,
            Self::Uint64Slice(_) => ReplyKind::Uint64Slice,
            Self::Float64Slice(_) => ReplyKind::Float64Slice,
            Self::BytesSlice(_) => ReplyKind::BytesSlice,
            Self::IntMap(_) => ReplyKind::IntMap,
            Self::Int64Map(_) => ReplyKind::Int64Map,
            Self::Uint64Map(_) => ReplyKind::Uint64Map,
            Self::Float64Map(_) => ReplyKind::Float64Map,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => i64::try_from(*n).ok(),
            Self::Int64(n) => Some(*n),
            Self::Uint64(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_raw(self) -> Option<Value> {
        match self {
            Self::Raw(value) => Some(value),
            _ => None,
        }
    }
}
