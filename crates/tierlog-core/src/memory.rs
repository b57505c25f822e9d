//! In-process implementations of [`IntermediateBuffer`] and [`RelationalSink`].
//!
//! Used by tests and for running the pipeline without Redis or PostgreSQL.
//! Both can be switched "offline" to simulate an outage.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::defaults::BACKUP_MAX_ENTRIES;
use crate::health::{HealthState, SinkHealth};
use crate::models::ExtendedEntry;
use crate::traits::{IntermediateBuffer, RelationalSink};
use crate::{Error, Result};

// =============================================================================
// BUFFER
// =============================================================================

#[derive(Default)]
struct BufferLists {
    queue: VecDeque<ExtendedEntry>,
    backup: VecDeque<ExtendedEntry>,
}

/// In-memory intermediate buffer.
pub struct MemoryBuffer {
    lists: Mutex<BufferLists>,
    backup_cap: usize,
    online: AtomicBool,
    connected: AtomicBool,
    push_calls: AtomicUsize,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::with_backup_cap(BACKUP_MAX_ENTRIES)
    }

    pub fn with_backup_cap(backup_cap: usize) -> Self {
        Self {
            lists: Mutex::new(BufferLists::default()),
            backup_cap,
            online: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            push_calls: AtomicUsize::new(0),
        }
    }

    /// Simulate the store becoming unreachable (`false`) or coming back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of successful `push_logs` calls.
    pub fn push_calls(&self) -> usize {
        self.push_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the main list, oldest first, without consuming it.
    pub async fn peek(&self) -> Vec<ExtendedEntry> {
        self.lists.lock().await.queue.iter().cloned().collect()
    }

    /// Snapshot of the backup list, oldest first.
    pub async fn backup(&self) -> Vec<ExtendedEntry> {
        self.lists.lock().await.backup.iter().cloned().collect()
    }

    fn check_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable("memory buffer offline".to_string()))
        }
    }
}

impl Default for MemoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntermediateBuffer for MemoryBuffer {
    async fn connect(&self) -> Result<()> {
        self.check_online()?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn push_logs(&self, entries: &[ExtendedEntry]) -> Result<usize> {
        self.connect().await?;
        if entries.is_empty() {
            return Ok(0);
        }

        let mut lists = self.lists.lock().await;
        for entry in entries {
            lists.queue.push_back(entry.clone());
            if entry.level().is_severe() {
                lists.backup.push_back(entry.clone());
            }
        }
        while lists.backup.len() > self.backup_cap {
            lists.backup.pop_front();
        }
        self.push_calls.fetch_add(1, Ordering::SeqCst);
        Ok(entries.len())
    }

    async fn get_logs(&self, count: usize) -> Result<Vec<ExtendedEntry>> {
        self.connect().await?;
        let mut lists = self.lists.lock().await;
        let take = count.min(lists.queue.len());
        Ok(lists.queue.drain(..take).collect())
    }

    async fn get_log_count(&self) -> Result<usize> {
        self.connect().await?;
        Ok(self.lists.lock().await.queue.len())
    }

    async fn ping(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// SINK
// =============================================================================

#[derive(Default)]
struct SinkTables {
    request_logs: Vec<ExtendedEntry>,
    error_logs: Vec<ExtendedEntry>,
    ids: HashSet<Uuid>,
}

/// In-memory relational sink with unique-id semantics.
pub struct MemorySink {
    tables: Mutex<SinkTables>,
    online: AtomicBool,
    health: HealthState,
    store_calls: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(SinkTables::default()),
            online: AtomicBool::new(true),
            health: HealthState::new(),
            store_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of store calls received, successful or not.
    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub async fn request_logs(&self) -> Vec<ExtendedEntry> {
        self.tables.lock().await.request_logs.clone()
    }

    pub async fn error_logs(&self) -> Vec<ExtendedEntry> {
        self.tables.lock().await.error_logs.clone()
    }

    async fn insert(&self, entries: &[ExtendedEntry], error_table: bool) -> usize {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            self.health.record_write_failure();
            return 0;
        }

        let mut tables = self.tables.lock().await;
        let mut inserted = 0;
        for entry in entries {
            if !tables.ids.insert(entry.id()) {
                continue;
            }
            if error_table {
                tables.error_logs.push(entry.clone());
            } else {
                tables.request_logs.push(entry.clone());
            }
            inserted += 1;
        }
        self.health.mark_connected();
        inserted
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationalSink for MemorySink {
    async fn store_request_logs(&self, entries: &[ExtendedEntry]) -> usize {
        self.insert(entries, false).await
    }

    async fn store_error_logs(&self, entries: &[ExtendedEntry]) -> usize {
        self.insert(entries, true).await
    }

    async fn ping(&self) -> bool {
        let ok = self.online.load(Ordering::SeqCst);
        self.health.record(ok);
        ok
    }

    fn health(&self) -> SinkHealth {
        self.health.get()
    }

    fn write_failures(&self) -> u64 {
        self.health.write_failures()
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::LogMetadata;
    use crate::models::{LogEntry, LogLevel, LogType, ProcessInfo};

    fn ext(level: LogLevel, message: &str) -> ExtendedEntry {
        ProcessInfo::detect("test", "test").extend(LogEntry::new(
            level,
            message,
            LogType::Request,
            LogMetadata::default(),
        ))
    }

    #[tokio::test]
    async fn test_buffer_is_fifo() {
        let buffer = MemoryBuffer::new();
        let batch = vec![
            ext(LogLevel::Info, "A"),
            ext(LogLevel::Info, "B"),
            ext(LogLevel::Info, "C"),
        ];
        assert_eq!(buffer.push_logs(&batch).await.unwrap(), 3);

        let first = buffer.get_logs(2).await.unwrap();
        let messages: Vec<_> = first.iter().map(|e| e.entry.message()).collect();
        assert_eq!(messages, ["A", "B"]);
        assert_eq!(buffer.get_log_count().await.unwrap(), 1);

        let rest = buffer.get_logs(10).await.unwrap();
        assert_eq!(rest[0].entry.message(), "C");
        assert!(buffer.get_logs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buffer_backup_keeps_newest_severe_entries() {
        let buffer = MemoryBuffer::with_backup_cap(2);
        let batch = vec![
            ext(LogLevel::Error, "e1"),
            ext(LogLevel::Info, "i1"),
            ext(LogLevel::Warn, "w1"),
            ext(LogLevel::Error, "e2"),
        ];
        buffer.push_logs(&batch).await.unwrap();

        let backup = buffer.backup().await;
        let messages: Vec<_> = backup.iter().map(|e| e.entry.message()).collect();
        assert_eq!(messages, ["w1", "e2"]);

        // Draining the main list leaves the backup untouched
        buffer.get_logs(10).await.unwrap();
        assert_eq!(buffer.backup().await.len(), 2);
    }

    #[tokio::test]
    async fn test_buffer_offline_fails() {
        let buffer = MemoryBuffer::new();
        buffer.set_online(false);
        assert!(buffer.push_logs(&[ext(LogLevel::Info, "x")]).await.is_err());
        assert!(!buffer.ping().await);
        assert!(buffer.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_sink_skips_duplicate_ids() {
        let sink = MemorySink::new();
        let entry = ext(LogLevel::Info, "once");
        assert_eq!(sink.store_request_logs(&[entry.clone()]).await, 1);
        assert_eq!(sink.store_request_logs(&[entry]).await, 0);
        assert_eq!(sink.request_logs().await.len(), 1);
        assert_eq!(sink.health(), SinkHealth::Connected);
    }

    #[tokio::test]
    async fn test_sink_offline_returns_zero_and_degrades() {
        let sink = MemorySink::new();
        sink.set_online(false);
        assert_eq!(sink.store_error_logs(&[ext(LogLevel::Error, "x")]).await, 0);
        assert_eq!(sink.health(), SinkHealth::Degraded);

        sink.set_online(true);
        assert!(sink.ping().await);
        assert_eq!(sink.health(), SinkHealth::Connected);
        assert_eq!(sink.write_failures(), 1);
    }
}
