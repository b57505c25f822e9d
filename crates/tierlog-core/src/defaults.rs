//! Centralized default constants for the tierlog pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Config structs in every crate fall back to these.

// =============================================================================
// ENTRY QUEUE
// =============================================================================

/// Interval of the background Entry Queue → buffer flush.
pub const FLUSH_INTERVAL_MS: u64 = 5_000;

/// Maximum entries held in memory; reaching it triggers an immediate flush.
pub const MAX_MEMORY_QUEUE_SIZE: usize = 1_000;

// =============================================================================
// BUFFER → SINK DRAIN
// =============================================================================

/// Entries taken from the intermediate buffer per sink round-trip.
pub const BATCH_SIZE: usize = 100;

/// Buffer length at which the background task drains to the sink early.
pub const DRAIN_THRESHOLD: usize = 100;

/// Maximum time between background drains of the buffer.
pub const DRAIN_INTERVAL_MS: u64 = 30_000;

// =============================================================================
// INTERMEDIATE BUFFER (REDIS)
// =============================================================================

/// Default Redis connection URL.
pub const REDIS_URL: &str = "redis://localhost:6379";

/// Key prefix for the buffer lists.
pub const REDIS_PREFIX: &str = "logs:";

/// Maximum entries retained in the Warn/Error backup list.
pub const BACKUP_MAX_ENTRIES: usize = 10_000;

/// Base delay between reconnection attempts; grows linearly per attempt.
pub const RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound on the reconnection delay.
pub const RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Timeout for establishing a Redis connection.
pub const REDIS_CONNECT_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// RELATIONAL SINK (POSTGRES)
// =============================================================================

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/tierlog";

/// Maximum rows per INSERT statement (keeps bind parameters under 65535).
pub const MAX_ROWS_PER_INSERT: usize = 1_000;

// =============================================================================
// PROCESS IDENTITY
// =============================================================================

/// Application name stamped on every durable entry.
pub const APP_NAME: &str = "tierlog";

/// Environment name stamped on every durable entry.
pub const ENVIRONMENT: &str = "development";

// =============================================================================
// EVENTS
// =============================================================================

/// Capacity of the pipeline event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;
