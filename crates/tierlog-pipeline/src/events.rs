//! Pipeline events and flush outcomes.

use serde::Serialize;

/// What caused an Entry Queue flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushTrigger {
    /// The periodic background tick.
    Timer,
    /// The queue reached its cap.
    Size,
    /// A Warn/Error entry was enqueued.
    Severity,
    /// An explicit `flush`/`flush_all` call.
    Manual,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Timer => "timer",
            FlushTrigger::Size => "size",
            FlushTrigger::Severity => "severity",
            FlushTrigger::Manual => "manual",
        }
    }
}

/// Event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// `initialize` ran its probes and started the background task.
    Started { buffer_ok: bool, sink_ok: bool },
    /// Entries moved from the Entry Queue to the buffer.
    QueueFlushed { count: usize, trigger: FlushTrigger },
    /// Pushing to the buffer failed; entries went back into memory unless
    /// the buffer refused them as unencodable.
    QueueFlushFailed {
        requeued: usize,
        dropped: usize,
        error: String,
    },
    /// One batch moved from the buffer to the sink.
    SinkBatchStored {
        fetched: usize,
        request_rows: usize,
        error_rows: usize,
    },
    /// The sink failed while draining; the batch is lost.
    SinkBatchFailed { fetched: usize },
    /// Shutdown completed.
    Stopped,
}

/// Result of one Entry Queue → buffer flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushOutcome {
    /// Nothing to flush.
    #[default]
    Empty,
    /// Another flush holds the single-flight guard; nothing done.
    InProgress,
    /// Entries pushed to the buffer.
    Flushed(usize),
    /// Push failed. `requeued` entries of the batch went back to memory;
    /// `dropped` counts everything lost over the cap, newer entries included.
    Failed { requeued: usize, dropped: usize },
}

/// Result of draining the buffer into the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Entries taken out of the buffer.
    pub fetched: usize,
    pub request_rows: usize,
    pub error_rows: usize,
    /// Entries with no destination (console-only below Warn).
    pub discarded: usize,
    /// The drain stopped early because the sink failed.
    pub sink_failed: bool,
    /// The drain stopped early because the buffer failed.
    pub buffer_failed: bool,
}

impl DrainReport {
    pub fn rows_written(&self) -> usize {
        self.request_rows + self.error_rows
    }
}

/// Result of [`Logger::flush_all`](crate::Logger::flush_all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub queue: FlushOutcome,
    pub drain: DrainReport,
}
