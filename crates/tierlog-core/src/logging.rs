//! Structured logging schema and field name constants for tierlog.
//!
//! Every crate uses these constants for the pipeline's own diagnostics so
//! they can be queried by the same field names no matter which tier
//! emitted them.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A tier failed and entries were dropped or the sink degraded |
//! | WARN  | Recoverable issue, entries re-buffered in memory |
//! | INFO  | Lifecycle events (initialize, shutdown), drains |
//! | DEBUG | Individual flushes and their sizes |
//! | TRACE | Per-entry decisions |

/// Target used when user log entries are echoed to the console.
///
/// Pipeline diagnostics use the crate's own module path as target, so a
/// subscriber can separate the two streams with an `EnvFilter` directive.
pub const ENTRY_TARGET: &str = "tierlog::entry";

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the diagnostic.
/// Values: "pipeline", "buffer", "sink"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "entry_queue", "redis", "postgres", "flusher"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "flush_queue", "drain_buffer", "push_logs", "store_request_logs"
pub const OPERATION: &str = "op";

/// Correlation ID of the request an entry belongs to.
pub const REQUEST_ID: &str = "request_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries handled by an operation.
pub const ENTRY_COUNT: &str = "entry_count";

/// Number of entries put back into the in-memory queue.
pub const REQUEUED: &str = "requeued";

/// Number of entries discarded because a cap was reached.
pub const DROPPED: &str = "dropped";

/// Rows newly inserted by the sink.
pub const ROWS_INSERTED: &str = "rows_inserted";

/// Entries currently waiting in the intermediate buffer.
pub const BUFFER_LEN: &str = "buffer_len";

/// Entries currently waiting in the in-memory queue.
pub const QUEUE_LEN: &str = "queue_len";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// What caused a flush ("timer", "size", "severity", "manual").
pub const TRIGGER: &str = "trigger";
