//! Configuration structs

mod app_config;

pub use app_config::{AppConfig, ConfigError, RedisConfig, ENV_PREFIX};
