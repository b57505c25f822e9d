//! # tierlog-cache
//!
//! Redis-backed intermediate buffer for the tierlog pipeline.
//!
//! The buffer is the crash boundary between process memory and PostgreSQL:
//! once an entry has been pushed here it survives a process restart.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
//! - `LOG_REDIS_PREFIX`: key prefix for the lists (default: `logs:`)
//! - `LOG_BACKUP_MAX`: Warn/Error backup list cap (default: 10000)

pub mod buffer;
pub mod config;

pub use buffer::RedisBuffer;
pub use config::{ReconnectPolicy, RedisBufferConfig};
