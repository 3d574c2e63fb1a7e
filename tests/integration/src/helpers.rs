//! Test helpers for integration tests
//!
//! Tests read the server location from `REDIS_HOST`, `REDIS_PORT` and
//! `REDIS_PASSWORD` and skip themselves when `REDIS_HOST` is unset.

use std::env;

use anyhow::{Context, Result};
use neko_cache::{RedisFacade, RedisPool};
use neko_common::RedisConfig;
use uuid::Uuid;

/// Build a config pointing at the test server
pub fn test_config() -> Result<RedisConfig> {
    let _ = dotenvy::dotenv();

    Ok(RedisConfig {
        enable: true,
        max_idle: 4,
        max_active: 8,
        idle_timeout: 30_000,
        wait_timeout: Some(5_000),
        ip: env::var("REDIS_HOST").context("REDIS_HOST not set")?,
        port: env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string()),
        password: env::var("REDIS_PASSWORD").unwrap_or_default(),
    })
}

/// Facade over a fresh pool for the test server
pub fn test_facade() -> Result<RedisFacade<RedisPool>> {
    let config = test_config()?;
    let pool = RedisPool::from_config(&config)?.context("pool disabled")?;
    Ok(RedisFacade::new(pool))
}

/// A key no other test run will touch
pub fn unique_key(prefix: &str) -> String {
    format!("neko-test:{prefix}:{}", Uuid::new_v4().simple())
}

/// Check that the test server is reachable.
///
/// Returns false (and the calling test should return early) when
/// `REDIS_HOST` is unset or the server does not answer `PING`.
pub async fn check_test_env() -> bool {
    let _ = neko_common::try_init_tracing();

    let Ok(facade) = test_facade() else {
        eprintln!("Skipping test: REDIS_HOST not set");
        return false;
    };

    match facade.source().health_check().await {
        Ok(()) => true,
        Err(err) => {
            eprintln!("Skipping test: Redis not reachable ({err})");
            false
        }
    }
}
