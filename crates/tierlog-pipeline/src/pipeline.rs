//! Shared pipeline state and the two movement stages.
//!
//! Stage one moves the Entry Queue into the intermediate buffer; stage two
//! drains the buffer into the relational sink. Both run under one
//! single-flight guard so at most one movement is ever in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use tierlog_core::{
    defaults, Destination, ExtendedEntry, IntermediateBuffer, LogEntry, ProcessInfo,
    RelationalSink,
};

use crate::config::LoggerConfig;
use crate::events::{DrainReport, FlushOutcome, FlushReport, FlushTrigger, PipelineEvent};
use crate::flusher::FlushTask;
use crate::queue::{EnqueueOutcome, EntryQueue, Requeued};
use crate::stats::PipelineStats;

pub(crate) struct Pipeline {
    pub config: LoggerConfig,
    pub process: ProcessInfo,
    pub queue: EntryQueue,
    pub buffer: Arc<dyn IntermediateBuffer>,
    pub sink: Arc<dyn RelationalSink>,
    pub events: broadcast::Sender<PipelineEvent>,
    pub stats: PipelineStats,
    flight: AsyncMutex<()>,
    background: Mutex<Option<FlushTask>>,
    closed: AtomicBool,
}

impl Pipeline {
    pub fn new(
        config: LoggerConfig,
        buffer: Arc<dyn IntermediateBuffer>,
        sink: Arc<dyn RelationalSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            process: ProcessInfo::detect(&config.app_name, &config.environment),
            queue: EntryQueue::new(config.max_memory_queue_size),
            config,
            buffer,
            sink,
            events,
            stats: PipelineStats::default(),
            flight: AsyncMutex::new(()),
            background: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Mark closed. Returns `false` if it already was.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn install_background(&self, task: FlushTask) -> Option<FlushTask> {
        let mut slot = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.take();
        *slot = Some(task);
        previous
    }

    pub fn has_background(&self) -> bool {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn take_background(&self) -> Option<FlushTask> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Enqueue a durable entry and fire an asynchronous flush when it is
    /// severe or the queue has reached its cap.
    ///
    /// The flush's batch is sealed here, before anything awaits, so later
    /// entries land in a fresh queue instead of being turned away.
    pub fn accept(self: &Arc<Self>, entry: LogEntry) {
        if self.is_closed() {
            debug!(
                subsystem = "pipeline",
                entry_id = %entry.id(),
                "Logger shut down, entry kept on console only"
            );
            return;
        }

        let severe = entry.level().is_severe();
        let runtime = tokio::runtime::Handle::try_current().ok();
        match self.queue.enqueue(entry, runtime.is_some()) {
            EnqueueOutcome::Queued(_) => {
                PipelineStats::add(&self.stats.enqueued, 1);
                if runtime.is_none() && severe {
                    debug!(
                        subsystem = "pipeline",
                        "No async runtime, deferring flush"
                    );
                }
            }
            EnqueueOutcome::Sealed(_) => {
                PipelineStats::add(&self.stats.enqueued, 1);
                let trigger = if severe {
                    FlushTrigger::Severity
                } else {
                    FlushTrigger::Size
                };
                if let Some(handle) = runtime {
                    let pipeline = Arc::clone(self);
                    handle.spawn(async move {
                        pipeline.flush_queue(trigger).await;
                    });
                }
            }
            EnqueueOutcome::Rejected => {
                PipelineStats::add(&self.stats.rejected, 1);
                warn!(
                    subsystem = "pipeline",
                    queue_len = self.queue.capacity(),
                    "Entry queue full with no async runtime to flush it, entry dropped"
                );
            }
        }
    }

    /// Entry Queue → buffer, waiting for any in-flight movement first.
    async fn flush_queue(&self, trigger: FlushTrigger) -> FlushOutcome {
        let _guard = self.flight.lock().await;
        self.flush_queue_locked(trigger).await
    }

    /// Entry Queue → buffer, skipped if another movement is in flight.
    pub async fn try_flush_queue(&self, trigger: FlushTrigger) -> FlushOutcome {
        let Ok(_guard) = self.flight.try_lock() else {
            debug!(
                subsystem = "pipeline",
                trigger = trigger.as_str(),
                "Flush already in progress, skipping"
            );
            return FlushOutcome::InProgress;
        };
        self.flush_queue_locked(trigger).await
    }

    async fn flush_queue_locked(&self, trigger: FlushTrigger) -> FlushOutcome {
        let drained = self.queue.drain_all();
        if drained.is_empty() {
            return FlushOutcome::Empty;
        }

        let start = Instant::now();
        let batch: Vec<ExtendedEntry> = drained
            .into_iter()
            .map(|entry| self.process.extend(entry))
            .collect();

        match self.buffer.push_logs(&batch).await {
            Ok(count) => {
                PipelineStats::add(&self.stats.pushed, count);
                debug!(
                    subsystem = "pipeline",
                    op = "flush_queue",
                    trigger = trigger.as_str(),
                    entry_count = count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Flushed entry queue to buffer"
                );
                self.emit(PipelineEvent::QueueFlushed { count, trigger });
                FlushOutcome::Flushed(count)
            }
            Err(e) if !e.is_transient() => {
                let dropped = batch.len();
                PipelineStats::add(&self.stats.push_failures, 1);
                PipelineStats::add(&self.stats.dropped, dropped);
                error!(
                    subsystem = "pipeline",
                    op = "flush_queue",
                    dropped,
                    error = %e,
                    "Buffer rejected batch, entries dropped"
                );
                self.emit(PipelineEvent::QueueFlushFailed {
                    requeued: 0,
                    dropped,
                    error: e.to_string(),
                });
                FlushOutcome::Failed {
                    requeued: 0,
                    dropped,
                }
            }
            Err(e) => {
                let entries: Vec<LogEntry> = batch.into_iter().map(|x| x.entry).collect();
                let Requeued {
                    kept: requeued,
                    dropped,
                } = self.queue.requeue_front(entries);

                PipelineStats::add(&self.stats.push_failures, 1);
                PipelineStats::add(&self.stats.requeued, requeued);
                PipelineStats::add(&self.stats.dropped, dropped);
                if dropped > 0 {
                    error!(
                        subsystem = "pipeline",
                        op = "flush_queue",
                        requeued,
                        dropped,
                        error = %e,
                        "Buffer push failed, entries dropped over queue cap"
                    );
                } else {
                    warn!(
                        subsystem = "pipeline",
                        op = "flush_queue",
                        requeued,
                        error = %e,
                        "Buffer push failed, entries requeued"
                    );
                }
                self.emit(PipelineEvent::QueueFlushFailed {
                    requeued,
                    dropped,
                    error: e.to_string(),
                });
                FlushOutcome::Failed { requeued, dropped }
            }
        }
    }

    /// Buffer → sink until the buffer reports empty.
    ///
    /// Stops early when the buffer errors or a store call fails, so a dead
    /// sink costs at most one batch per drain.
    async fn drain_buffer_locked(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let batch_size = self.config.batch_size;
        let start = Instant::now();

        loop {
            let batch = match self.buffer.get_logs(batch_size).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        subsystem = "pipeline",
                        op = "drain_buffer",
                        error = %e,
                        "Reading from buffer failed"
                    );
                    report.buffer_failed = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            let fetched = batch.len();
            report.fetched += fetched;
            let failures_before = self.sink.write_failures();

            let mut requests = Vec::new();
            let mut errors = Vec::new();
            for entry in batch {
                match entry.destination() {
                    Some(Destination::RequestLogs) => requests.push(entry),
                    Some(Destination::ErrorLogs) => errors.push(entry),
                    None => report.discarded += 1,
                }
            }

            let request_rows = if requests.is_empty() {
                0
            } else {
                self.sink.store_request_logs(&requests).await
            };
            let error_rows = if errors.is_empty() {
                0
            } else {
                self.sink.store_error_logs(&errors).await
            };
            report.request_rows += request_rows;
            report.error_rows += error_rows;
            PipelineStats::add(&self.stats.request_rows, request_rows);
            PipelineStats::add(&self.stats.error_rows, error_rows);

            let attempted = !requests.is_empty() || !errors.is_empty();
            if attempted && self.sink.write_failures() != failures_before {
                PipelineStats::add(&self.stats.sink_failures, 1);
                error!(
                    subsystem = "pipeline",
                    op = "drain_buffer",
                    entry_count = fetched,
                    "Sink write failed, batch lost"
                );
                self.emit(PipelineEvent::SinkBatchFailed { fetched });
                report.sink_failed = true;
                break;
            }

            self.emit(PipelineEvent::SinkBatchStored {
                fetched,
                request_rows,
                error_rows,
            });
        }

        if report.fetched > 0 {
            debug!(
                subsystem = "pipeline",
                op = "drain_buffer",
                entry_count = report.fetched,
                rows_inserted = report.rows_written(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Drained buffer into sink"
            );
        }
        report
    }

    /// Both stages in order, waiting for any in-flight movement first.
    pub async fn flush_all(&self) -> FlushReport {
        let _guard = self.flight.lock().await;
        let queue = self.flush_queue_locked(FlushTrigger::Manual).await;
        let drain = self.drain_buffer_locked().await;
        FlushReport { queue, drain }
    }

    /// One background tick: flush the queue, then drain when the buffer is
    /// past the threshold or the drain interval has elapsed.
    pub async fn tick(&self, last_drain: &mut Instant) {
        let Ok(_guard) = self.flight.try_lock() else {
            debug!(subsystem = "pipeline", "Tick skipped, flush in progress");
            return;
        };

        self.flush_queue_locked(FlushTrigger::Timer).await;

        let due = last_drain.elapsed() >= self.config.drain_interval;
        let over_threshold = !due
            && match self.buffer.get_log_count().await {
                Ok(len) => len >= self.config.drain_threshold && len > 0,
                Err(_) => false,
            };

        if due || over_threshold {
            self.drain_buffer_locked().await;
            *last_drain = Instant::now();
        }
    }
}
