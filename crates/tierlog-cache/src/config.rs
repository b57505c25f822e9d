//! Configuration for the Redis buffer.

use std::time::Duration;

use tierlog_core::defaults;
use tierlog_core::{Error, Result};

/// Linear reconnection backoff: `base * attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(defaults::RECONNECT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(defaults::RECONNECT_MAX_DELAY_MS),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        self.base_delay
            .checked_mul(failures)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Redis buffer configuration.
#[derive(Debug, Clone)]
pub struct RedisBufferConfig {
    /// Redis connection URL.
    pub url: String,
    /// Prefix for the `queue` and `backup` list keys.
    pub prefix: String,
    /// Maximum entries kept in the Warn/Error backup list.
    pub backup_max_entries: usize,
    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for RedisBufferConfig {
    fn default() -> Self {
        Self {
            url: defaults::REDIS_URL.to_string(),
            prefix: defaults::REDIS_PREFIX.to_string(),
            backup_max_entries: defaults::BACKUP_MAX_ENTRIES,
            connect_timeout: Duration::from_millis(defaults::REDIS_CONNECT_TIMEOUT_MS),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl RedisBufferConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REDIS_URL` | `redis://localhost:6379` | Connection URL |
    /// | `LOG_REDIS_PREFIX` | `logs:` | Key prefix |
    /// | `LOG_BACKUP_MAX` | `10000` | Backup list cap |
    ///
    /// Unparsable or zero values are rejected.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REDIS_URL") {
            config.url = url;
        }
        if let Ok(prefix) = std::env::var("LOG_REDIS_PREFIX") {
            config.prefix = prefix;
        }
        if let Ok(raw) = std::env::var("LOG_BACKUP_MAX") {
            config.backup_max_entries = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("LOG_BACKUP_MAX is not a count: {raw}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_backup_max_entries(mut self, max: usize) -> Self {
        self.backup_max_entries = max;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.backup_max_entries == 0 {
            return Err(Error::Config("backup_max_entries must be > 0".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::Config("connect_timeout must be > 0".to_string()));
        }
        Ok(())
    }

    /// Key of the main FIFO list.
    pub fn queue_key(&self) -> String {
        format!("{}queue", self.prefix)
    }

    /// Key of the Warn/Error backup list.
    pub fn backup_key(&self) -> String {
        format!("{}backup", self.prefix)
    }
}
