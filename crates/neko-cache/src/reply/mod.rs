//! Typed reply coercion.

mod coercion;

pub use coercion::{Reply, ReplyKind, UnknownReplyKind};
