//! Storage traits for the two downstream tiers.

use async_trait::async_trait;

use crate::health::SinkHealth;
use crate::models::ExtendedEntry;
use crate::Result;

/// Intermediate durable buffer between process memory and the sink.
///
/// Holds a main FIFO list consumed by the pipeline and a bounded backup list
/// of Warn/Error entries that the pipeline never consumes.
#[async_trait]
pub trait IntermediateBuffer: Send + Sync {
    /// Establish the connection if not already connected. Idempotent.
    async fn connect(&self) -> Result<()>;

    /// Append entries to the main list, preserving slice order.
    ///
    /// Warn/Error entries are also appended to the backup list.
    async fn push_logs(&self, entries: &[ExtendedEntry]) -> Result<usize>;

    /// Remove and return up to `count` of the oldest entries, oldest first.
    ///
    /// Read and removal are one atomic step; no entry is handed out twice
    /// to a single consumer.
    async fn get_logs(&self, count: usize) -> Result<Vec<ExtendedEntry>>;

    /// Length of the main list.
    async fn get_log_count(&self) -> Result<usize>;

    /// Liveness probe. Never fails, reports `false` instead.
    async fn ping(&self) -> bool;

    async fn disconnect(&self);
}

/// Final relational destination split into request and error tables.
///
/// Store methods never fail: on error they return 0 and move the sink to
/// [`SinkHealth::Degraded`]. Entries whose id already exists are skipped,
/// and the returned count is rows actually created.
#[async_trait]
pub trait RelationalSink: Send + Sync {
    async fn store_request_logs(&self, entries: &[ExtendedEntry]) -> usize;

    async fn store_error_logs(&self, entries: &[ExtendedEntry]) -> usize;

    /// Reachability probe; updates the health state.
    async fn ping(&self) -> bool;

    /// Last known health without probing.
    fn health(&self) -> SinkHealth;

    /// Number of failed store calls since creation. Never decreases.
    fn write_failures(&self) -> u64;

    async fn close(&self);
}
