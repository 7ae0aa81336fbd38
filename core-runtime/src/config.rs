//! # Bridge Configuration
//!
//! Settings for the request server and the main-thread pump.
//!
//! ## Overview
//!
//! Configuration comes from two places:
//!
//! - [`BridgeConfig::from_env`] reads the process environment, the only
//!   configuration channel a plugin loaded by the simulator has. Values that
//!   are unset or invalid fall back to documented defaults with a warning;
//!   a plugin that refuses to load over a typo is worse than one listening on
//!   the default port.
//! - [`BridgeConfig::builder`] constructs a config explicitly (tests, the
//!   headless runner) and validates it strictly.
//!
//! ## Environment
//!
//! | Variable | Default | Rule |
//! |----------|---------|------|
//! | `XAI_MCP_HOST` | `0.0.0.0` | non-empty |
//! | `XAI_MCP_PORT` | `8765` | integer in 1..=65535 |
//! | `XAI_MCP_WORKERS` | `2` | integer in 1..=64 |
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::BridgeConfig;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::builder()
//!     .host("127.0.0.1")
//!     .port(9000)
//!     .worker_threads(4)
//!     .main_thread_timeout(Duration::from_secs(5))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.bind_address(), "127.0.0.1:9000");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;
use tracing::warn;

pub const ENV_HOST: &str = "XAI_MCP_HOST";
pub const ENV_PORT: &str = "XAI_MCP_PORT";
pub const ENV_WORKERS: &str = "XAI_MCP_WORKERS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_WORKER_THREADS: usize = 2;
pub const MAX_WORKER_THREADS: usize = 64;

/// How long a worker waits for the pump thread before giving up.
pub const DEFAULT_MAIN_THREAD_TIMEOUT: Duration = Duration::from_secs(3);

/// Interval requested from the host between pump ticks.
pub const DEFAULT_PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// How often the aircraft state snapshot is refreshed.
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_SERVER_NAME: &str = "x-ai-xplane-mcp";

const MAX_MAIN_THREAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Bridge configuration. Use [`BridgeConfigBuilder`] or
/// [`BridgeConfig::from_env`] to construct.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Interface the request server binds to
    pub host: String,

    /// TCP port the request server binds to
    pub port: u16,

    /// Request worker pool size
    pub worker_threads: usize,

    /// Bounded wait for a job submitted from a worker thread
    pub main_thread_timeout: Duration,

    /// Delay the flight loop asks for between ticks
    pub pump_interval: Duration,

    /// Minimum accumulated sim time between snapshot refreshes
    pub snapshot_interval: Duration,

    /// Name reported by `initialize`
    pub server_name: String,

    /// Version reported by `initialize`
    pub server_version: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            worker_threads: DEFAULT_WORKER_THREADS,
            main_thread_timeout: DEFAULT_MAIN_THREAD_TIMEOUT,
            pump_interval: DEFAULT_PUMP_INTERVAL,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Load from the process environment, falling back per field.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            let host = host.trim();
            if !host.is_empty() {
                config.host = host.to_string();
            }
        }

        if let Some(port) = read_bounded(&lookup, ENV_PORT, u16::MAX as usize) {
            config.port = port as u16;
        }

        if let Some(workers) = read_bounded(&lookup, ENV_WORKERS, MAX_WORKER_THREADS) {
            config.worker_threads = workers;
        }

        config
    }

    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("Bind host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(Error::Config(
                "Port must be in the range 1..=65535".to_string(),
            ));
        }

        if self.worker_threads == 0 || self.worker_threads > MAX_WORKER_THREADS {
            return Err(Error::Config(format!(
                "Worker pool size must be in the range 1..={}",
                MAX_WORKER_THREADS
            )));
        }

        if self.main_thread_timeout.is_zero() {
            return Err(Error::Config(
                "Main thread timeout must be greater than zero".to_string(),
            ));
        }

        if self.main_thread_timeout > MAX_MAIN_THREAD_TIMEOUT {
            return Err(Error::Config(
                "Main thread timeout exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.pump_interval.is_zero() {
            return Err(Error::Config(
                "Pump interval must be greater than zero".to_string(),
            ));
        }

        if self.snapshot_interval.is_zero() {
            return Err(Error::Config(
                "Snapshot interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a positive integer no larger than `max`. Unset and empty values
/// are silent; anything else out of range is logged and ignored.
fn read_bounded<F>(lookup: &F, key: &str, max: usize) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<usize>() {
        Ok(value) if value > 0 && value <= max => Some(value),
        _ => {
            warn!(variable = key, value = raw, "Ignoring invalid value; using default");
            None
        }
    }
}

/// Builder for [`BridgeConfig`]. Unset fields take their defaults.
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    worker_threads: Option<usize>,
    main_thread_timeout: Option<Duration>,
    pump_interval: Option<Duration>,
    snapshot_interval: Option<Duration>,
    server_name: Option<String>,
    server_version: Option<String>,
}

impl BridgeConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    pub fn main_thread_timeout(mut self, timeout: Duration) -> Self {
        self.main_thread_timeout = Some(timeout);
        self
    }

    pub fn pump_interval(mut self, interval: Duration) -> Self {
        self.pump_interval = Some(interval);
        self
    }

    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    pub fn server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = Some(version.into());
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<BridgeConfig> {
        let defaults = BridgeConfig::default();
        let config = BridgeConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            worker_threads: self.worker_threads.unwrap_or(defaults.worker_threads),
            main_thread_timeout: self
                .main_thread_timeout
                .unwrap_or(defaults.main_thread_timeout),
            pump_interval: self.pump_interval.unwrap_or(defaults.pump_interval),
            snapshot_interval: self.snapshot_interval.unwrap_or(defaults.snapshot_interval),
            server_name: self.server_name.unwrap_or(defaults.server_name),
            server_version: self.server_version.unwrap_or(defaults.server_version),
        };

        config.validate()?;
        Ok(config)
    }
}
