//! Command facade: `Do`, `Load`, `Exists` and transactions over a pool.

mod client;
mod render;

pub use client::{BoundCommand, Loader, RedisFacade};
