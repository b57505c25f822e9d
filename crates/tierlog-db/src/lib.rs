//! # tierlog-db
//!
//! PostgreSQL relational sink for the tierlog pipeline.
//!
//! This crate provides:
//! - Connection pool management (lazy and eager)
//! - Mapping of enriched entries to `request_logs` / `error_logs` rows
//! - Batched, idempotent inserts (`ON CONFLICT (id) DO NOTHING`)
//! - Sink health tracking (`Unknown → Connected ⇄ Degraded`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use tierlog_db::PgLogSink;
//! use tierlog_core::RelationalSink;
//!
//! let sink = PgLogSink::connect_lazy("postgres://localhost/tierlog")?;
//! let created = sink.store_request_logs(&entries).await;
//! ```

pub mod pool;
pub mod rows;
pub mod sink;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

pub use pool::{create_lazy_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use rows::{ErrorLogRow, RequestLogRow};
pub use sink::PgLogSink;
