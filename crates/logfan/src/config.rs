//! Env-driven configuration for the fan-out layer.
//!
//! Required values (endpoint, API key, group identifier) fail validation
//! when missing — the registry refuses to start half-configured, since
//! silent loss on the audit streams is unacceptable. Optional tuning values
//! fall back to defaults when absent or unparseable.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::OverflowPolicy;
use crate::error::ConfigError;

/// Default per-stream buffer capacity (`C`).
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;
/// Default flush interval (`T`).
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;
/// Default send attempt budget per batch (`R`).
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default first backoff delay; doubles on each retry.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 100;
/// Default per-request send timeout.
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 5000;
/// Default bound on the final shutdown flush.
pub const DEFAULT_SHUTDOWN_DEADLINE_MS: u64 = 3000;

/// Remote-transport and dispatcher configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote aggregation endpoint.
    pub endpoint: String,
    /// Credential sent with every batch.
    pub api_key: String,
    /// Remote group identifier under which all streams are filed.
    pub group: String,
    /// Per-stream buffer capacity `C`; also the size-based flush trigger.
    pub buffer_capacity: usize,
    /// Time-based flush trigger `T`.
    pub flush_interval: Duration,
    /// Send attempts per batch before it is dropped.
    pub retry_attempts: u32,
    /// First retry delay; doubles on each subsequent attempt.
    pub retry_base_delay: Duration,
    /// Behavior when a stream buffer is full.
    pub overflow_policy: OverflowPolicy,
    /// HTTP timeout for a single batch send.
    pub flush_timeout: Duration,
    /// Bound on the best-effort final flush at shutdown.
    pub shutdown_deadline: Duration,
    /// Process-local diagnostic log level.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            group: String::new(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            overflow_policy: OverflowPolicy::DropOldest,
            flush_timeout: Duration::from_millis(DEFAULT_FLUSH_TIMEOUT_MS),
            shutdown_deadline: Duration::from_millis(DEFAULT_SHUTDOWN_DEADLINE_MS),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads configuration from `LOGFAN_*` environment variables and
    /// validates it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let endpoint = env::var("LOGFAN_ENDPOINT").unwrap_or_default();
        let api_key = env::var("LOGFAN_API_KEY").unwrap_or_default();
        let group = env::var("LOGFAN_GROUP").unwrap_or_default();

        let buffer_capacity = env_parse("LOGFAN_BUFFER_CAPACITY", defaults.buffer_capacity);
        let flush_interval = Duration::from_millis(env_parse(
            "LOGFAN_FLUSH_INTERVAL_MS",
            DEFAULT_FLUSH_INTERVAL_MS,
        ));
        let retry_attempts = env_parse("LOGFAN_RETRY_ATTEMPTS", defaults.retry_attempts);
        let retry_base_delay = Duration::from_millis(env_parse(
            "LOGFAN_RETRY_BASE_DELAY_MS",
            DEFAULT_RETRY_BASE_DELAY_MS,
        ));
        let overflow_policy = env::var("LOGFAN_OVERFLOW_POLICY")
            .ok()
            .and_then(|val| OverflowPolicy::from_str(&val).ok())
            .unwrap_or(defaults.overflow_policy);
        let flush_timeout = Duration::from_millis(env_parse(
            "LOGFAN_FLUSH_TIMEOUT_MS",
            DEFAULT_FLUSH_TIMEOUT_MS,
        ));
        let shutdown_deadline = Duration::from_millis(env_parse(
            "LOGFAN_SHUTDOWN_DEADLINE_MS",
            DEFAULT_SHUTDOWN_DEADLINE_MS,
        ));
        let log_level = env::var("LOGFAN_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            endpoint,
            api_key,
            group,
            buffer_capacity,
            flush_interval,
            retry_attempts,
            retry_base_delay,
            overflow_policy,
            flush_timeout,
            shutdown_deadline,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates required transport configuration and tuning bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("LOGFAN_ENDPOINT"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "endpoint '{}' must be an http(s) URL",
                self.endpoint
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("LOGFAN_API_KEY"));
        }
        if self.group.trim().is_empty() {
            return Err(ConfigError::Missing("LOGFAN_GROUP"));
        }
        if self.group.contains('/') || self.group.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "group '{}' must not contain '/' or whitespace",
                self.group
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer capacity must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "flush interval must be greater than 0".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry attempts must be at least 1".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log level '{}', must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<T>().ok())
        .unwrap_or(default)
}
