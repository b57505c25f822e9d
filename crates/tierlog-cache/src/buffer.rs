//! Redis-backed intermediate buffer.
//!
//! Entries are stored as JSON strings in two lists:
//! - `<prefix>queue`: main FIFO list, appended with RPUSH and consumed from
//!   the head with LRANGE + LTRIM inside one MULTI/EXEC.
//! - `<prefix>backup`: Warn/Error copies, trimmed to the newest N entries.
//!   Never consumed by the pipeline.

use std::time::Instant;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use tierlog_core::{Error, ExtendedEntry, IntermediateBuffer, Result};

use crate::config::RedisBufferConfig;

#[derive(Debug, Default)]
struct ReconnectState {
    failures: u32,
    next_attempt: Option<Instant>,
}

/// Intermediate buffer backed by Redis lists.
pub struct RedisBuffer {
    client: redis::Client,
    config: RedisBufferConfig,
    queue_key: String,
    backup_key: String,
    /// Lazily established connection manager (None until first use).
    connection: RwLock<Option<ConnectionManager>>,
    reconnect: Mutex<ReconnectState>,
}

impl RedisBuffer {
    /// Create a buffer client. Does not connect; the URL is validated only.
    pub fn new(config: RedisBufferConfig) -> Result<Self> {
        config.validate()?;
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| Error::Config(format!("invalid Redis URL: {e}")))?;

        Ok(Self {
            client,
            queue_key: config.queue_key(),
            backup_key: config.backup_key(),
            config,
            connection: RwLock::new(None),
            reconnect: Mutex::new(ReconnectState::default()),
        })
    }

    /// Create a buffer client from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(RedisBufferConfig::from_env()?)
    }

    pub fn config(&self) -> &RedisBufferConfig {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// Newest `count` entries of the backup list, oldest first.
    pub async fn get_backup_logs(&self, count: usize) -> Result<Vec<ExtendedEntry>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn
            .lrange(&self.backup_key, -(count as isize), -1)
            .await?;
        Ok(decode_all(raw))
    }

    /// Length of the backup list.
    pub async fn backup_len(&self) -> Result<usize> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(&self.backup_key).await?)
    }

    /// Clone of the live connection, connecting first if needed.
    async fn conn(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }
        self.connect().await?;
        self.connection
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or_else(|| Error::Unavailable("Redis connection closed".to_string()))
    }
}

fn decode_all(raw: Vec<String>) -> Vec<ExtendedEntry> {
    raw.into_iter()
        .filter_map(|item| match serde_json::from_str::<ExtendedEntry>(&item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(
                    subsystem = "buffer",
                    component = "redis",
                    error = %e,
                    "Skipping undecodable buffer entry"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl IntermediateBuffer for RedisBuffer {
    async fn connect(&self) -> Result<()> {
        if self.connection.read().await.is_some() {
            return Ok(());
        }

        let mut guard = self.connection.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut state = self.reconnect.lock().await;
        if let Some(next) = state.next_attempt {
            if Instant::now() < next {
                return Err(Error::Unavailable(format!(
                    "Redis reconnect backoff ({} failed attempts)",
                    state.failures
                )));
            }
        }

        let start = Instant::now();
        let attempt = tokio::time::timeout(
            self.config.connect_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await;

        let failure = match attempt {
            Ok(Ok(conn)) => {
                info!(
                    subsystem = "buffer",
                    component = "redis",
                    op = "connect",
                    duration_ms = start.elapsed().as_millis() as u64,
                    previous_failures = state.failures,
                    "Connected to Redis buffer"
                );
                *guard = Some(conn);
                *state = ReconnectState::default();
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "connection timed out after {}ms",
                self.config.connect_timeout.as_millis()
            ),
        };

        state.failures = state.failures.saturating_add(1);
        let delay = self.config.reconnect.delay_for(state.failures);
        state.next_attempt = Some(Instant::now() + delay);
        warn!(
            subsystem = "buffer",
            component = "redis",
            op = "connect",
            failures = state.failures,
            retry_in_ms = delay.as_millis() as u64,
            error = %failure,
            "Failed to connect to Redis buffer"
        );
        Err(Error::Redis(failure))
    }

    async fn push_logs(&self, entries: &[ExtendedEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut all = Vec::with_capacity(entries.len());
        let mut severe = Vec::new();
        for entry in entries {
            let encoded = serde_json::to_string(entry)?;
            if entry.level().is_severe() {
                severe.push(encoded.clone());
            }
            all.push(encoded);
        }

        let mut pipe = redis::pipe();
        pipe.atomic().rpush(&self.queue_key, &all).ignore();
        if !severe.is_empty() {
            pipe.rpush(&self.backup_key, &severe)
                .ignore()
                .ltrim(
                    &self.backup_key,
                    -(self.config.backup_max_entries as isize),
                    -1,
                )
                .ignore();
        }

        let mut conn = self.conn().await?;
        pipe.query_async::<()>(&mut conn).await?;

        debug!(
            subsystem = "buffer",
            component = "redis",
            op = "push_logs",
            entry_count = all.len(),
            backup_count = severe.len(),
            "Pushed entries to buffer"
        );
        Ok(all.len())
    }

    async fn get_logs(&self, count: usize) -> Result<Vec<ExtendedEntry>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn().await?;
        let (raw,): (Vec<String>,) = redis::pipe()
            .atomic()
            .lrange(&self.queue_key, 0, count as isize - 1)
            .ltrim(&self.queue_key, count as isize, -1)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(decode_all(raw))
    }

    async fn get_log_count(&self) -> Result<usize> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(&self.queue_key).await?)
    }

    async fn ping(&self) -> bool {
        let mut conn = match self.conn().await {
            Ok(conn) => conn,
            Err(_) => return false,
        };
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                debug!(subsystem = "buffer", component = "redis", error = %e, "PING failed");
                false
            }
        }
    }

    async fn disconnect(&self) {
        if self.connection.write().await.take().is_some() {
            info!(
                subsystem = "buffer",
                component = "redis",
                op = "disconnect",
                "Disconnected from Redis buffer"
            );
        }
    }
}
