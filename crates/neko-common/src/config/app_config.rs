//! Application configuration structs
//!
//! Loads configuration from an optional YAML file layered with environment
//! variables. Field names follow the camelCase keys of the config file.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `NEKO_REDIS__MAXIDLE=16`
pub const ENV_PREFIX: &str = "NEKO";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis connection and pool configuration
#[derive(Clone, Deserialize)]
pub struct RedisConfig {
    /// Gates pool creation; nothing is created when false
    #[serde(default)]
    pub enable: bool,
    /// Maximum number of idle connections kept in the pool
    #[serde(rename = "maxIdle", alias = "maxidle", default = "default_max_idle")]
    pub max_idle: usize,
    /// Maximum number of connections (0 lets the pool pick its default)
    #[serde(rename = "maxActive", alias = "maxactive", default)]
    pub max_active: usize,
    /// Idle connection timeout in milliseconds (0 or less disables it)
    #[serde(rename = "idleTimeout", alias = "idletimeout", default)]
    pub idle_timeout: i32,
    /// How long to wait for a free connection in milliseconds (unset waits forever)
    #[serde(rename = "waitTimeout", alias = "waittimeout", default)]
    pub wait_timeout: Option<u64>,
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub password: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enable: false,
            max_idle: default_max_idle(),
            max_active: 0,
            idle_timeout: 0,
            wait_timeout: None,
            ip: default_ip(),
            port: default_port(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("enable", &self.enable)
            .field("max_idle", &self.max_idle)
            .field("max_active", &self.max_active)
            .field("idle_timeout", &self.idle_timeout)
            .field("wait_timeout", &self.wait_timeout)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl RedisConfig {
    /// `ip:port` form of the server address
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Parse the configured port
    ///
    /// # Errors
    /// Returns an error if the port is not a valid TCP port number
    pub fn port_number(&self) -> Result<u16, ConfigError> {
        self.port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("redis.port", self.port.clone()))
    }

    /// Password to authenticate with, if any
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|p| !p.is_empty())
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        u64::try_from(self.idle_timeout)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout.map(Duration::from_millis)
    }
}

// Default value functions
fn default_max_idle() -> usize {
    8
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> String {
    "6379".to_string()
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load configuration from a YAML file, overridden by environment variables
    ///
    /// The file is optional; a missing file leaves every field at its default.
    ///
    /// # Errors
    /// Returns an error if the file or an override cannot be parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let settings = Config::builder()
            .add_source(
                File::from(path.as_ref())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(env_source())
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from environment variables only
    ///
    /// # Errors
    /// Returns an error if an environment override cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let settings = Config::builder().add_source(env_source()).build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse configuration from YAML text, without environment overrides
    ///
    /// # Errors
    /// Returns an error if the YAML is malformed or a field has the wrong type
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
