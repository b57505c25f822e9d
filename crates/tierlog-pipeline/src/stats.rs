//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct PipelineStats {
    pub enqueued: AtomicU64,
    pub rejected: AtomicU64,
    pub pushed: AtomicU64,
    pub requeued: AtomicU64,
    pub dropped: AtomicU64,
    pub request_rows: AtomicU64,
    pub error_rows: AtomicU64,
    pub push_failures: AtomicU64,
    pub sink_failures: AtomicU64,
}

impl PipelineStats {
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            enqueued: get(&self.enqueued),
            rejected: get(&self.rejected),
            pushed: get(&self.pushed),
            requeued: get(&self.requeued),
            dropped: get(&self.dropped),
            request_rows: get(&self.request_rows),
            error_rows: get(&self.error_rows),
            push_failures: get(&self.push_failures),
            sink_failures: get(&self.sink_failures),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Entries accepted into the Entry Queue.
    pub enqueued: u64,
    /// Entries refused because the Entry Queue was full and no runtime was
    /// available to flush it.
    pub rejected: u64,
    /// Entries pushed to the intermediate buffer.
    pub pushed: u64,
    /// Entries put back into memory after a failed push.
    pub requeued: u64,
    /// Entries lost over the cap after a failed push, or refused by the
    /// buffer as unencodable.
    pub dropped: u64,
    pub request_rows: u64,
    pub error_rows: u64,
    pub push_failures: u64,
    pub sink_failures: u64,
}
