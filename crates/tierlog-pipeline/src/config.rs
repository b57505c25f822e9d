//! Pipeline configuration.

use std::str::FromStr;
use std::time::Duration;

use tierlog_cache::RedisBufferConfig;
use tierlog_core::{defaults, Error, Result};
use tierlog_db::PoolConfig;

/// Configuration for the [`Logger`](crate::Logger) and its downstream tiers.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Interval of the background Entry Queue → buffer flush.
    pub flush_interval: Duration,
    /// Entry Queue cap; reaching it triggers an immediate flush.
    pub max_memory_queue_size: usize,
    /// Entries per buffer → sink round-trip.
    pub batch_size: usize,
    /// Buffer length at which the background task drains early.
    pub drain_threshold: usize,
    /// Maximum time between background drains.
    pub drain_interval: Duration,
    /// Stamped on every durable entry.
    pub app_name: String,
    /// Stamped on every durable entry.
    pub environment: String,
    pub buffer: RedisBufferConfig,
    pub database_url: String,
    pub pool: PoolConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(defaults::FLUSH_INTERVAL_MS),
            max_memory_queue_size: defaults::MAX_MEMORY_QUEUE_SIZE,
            batch_size: defaults::BATCH_SIZE,
            drain_threshold: defaults::DRAIN_THRESHOLD,
            drain_interval: Duration::from_millis(defaults::DRAIN_INTERVAL_MS),
            app_name: defaults::APP_NAME.to_string(),
            environment: defaults::ENVIRONMENT.to_string(),
            buffer: RedisBufferConfig::default(),
            database_url: defaults::DATABASE_URL.to_string(),
            pool: PoolConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LOG_FLUSH_INTERVAL_MS` | `5000` | Entry Queue flush interval |
    /// | `LOG_MAX_MEMORY_QUEUE` | `1000` | Entry Queue cap |
    /// | `LOG_BATCH_SIZE` | `100` | Buffer → sink batch size |
    /// | `LOG_DRAIN_THRESHOLD` | `100` | Buffer length that triggers a drain |
    /// | `LOG_DRAIN_INTERVAL_MS` | `30000` | Maximum time between drains |
    /// | `APP_NAME` | `tierlog` | Application name |
    /// | `APP_ENV` | `development` | Environment name |
    /// | `DATABASE_URL` | `postgres://localhost/tierlog` | Sink database |
    ///
    /// Redis and pool settings are read by [`RedisBufferConfig::from_env`]
    /// and [`PoolConfig::from_env`]. A value that is present but does not
    /// parse is an error, not a silent fallback to the default.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            flush_interval: Duration::from_millis(env_or(
                "LOG_FLUSH_INTERVAL_MS",
                defaults::FLUSH_INTERVAL_MS,
            )?),
            max_memory_queue_size: env_or("LOG_MAX_MEMORY_QUEUE", defaults::MAX_MEMORY_QUEUE_SIZE)?,
            batch_size: env_or("LOG_BATCH_SIZE", defaults::BATCH_SIZE)?,
            drain_threshold: env_or("LOG_DRAIN_THRESHOLD", defaults::DRAIN_THRESHOLD)?,
            drain_interval: Duration::from_millis(env_or(
                "LOG_DRAIN_INTERVAL_MS",
                defaults::DRAIN_INTERVAL_MS,
            )?),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| defaults::APP_NAME.to_string()),
            environment: std::env::var("APP_ENV")
                .unwrap_or_else(|_| defaults::ENVIRONMENT.to_string()),
            buffer: RedisBufferConfig::from_env()?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            pool: PoolConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_memory_queue_size(mut self, max: usize) -> Self {
        self.max_memory_queue_size = max;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_drain_threshold(mut self, threshold: usize) -> Self {
        self.drain_threshold = threshold;
        self
    }

    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_buffer(mut self, buffer: RedisBufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_queue_size == 0 {
            return Err(Error::Config(
                "max_memory_queue_size must be > 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".to_string()));
        }
        if self.flush_interval.is_zero() {
            return Err(Error::Config("flush_interval must be > 0".to_string()));
        }
        if self.drain_interval.is_zero() {
            return Err(Error::Config("drain_interval must be > 0".to_string()));
        }
        self.buffer.validate()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} has invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
