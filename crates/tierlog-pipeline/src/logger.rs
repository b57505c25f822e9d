//! Public logging handle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use tierlog_cache::RedisBuffer;
use tierlog_core::{
    ErrorDetails, HealthReport, IntermediateBuffer, LogEntry, LogLevel, LogMetadata, LogType,
    RelationalSink, Result,
};
use tierlog_db::PgLogSink;

use crate::config::LoggerConfig;
use crate::console;
use crate::events::{FlushOutcome, FlushReport, FlushTrigger, PipelineEvent};
use crate::flusher::FlushTask;
use crate::pipeline::Pipeline;
use crate::stats::StatsSnapshot;

/// Cloneable handle to a tiered log pipeline.
///
/// Every call emits to the console immediately. Request, error and any
/// Warn/Error entries are additionally queued in memory, moved to the
/// intermediate buffer by a background task, and drained from there into
/// the relational sink.
///
/// Clones and [`child`](Self::child) loggers share one pipeline; they
/// differ only in the default metadata merged into each call.
#[derive(Clone)]
pub struct Logger {
    pipeline: Arc<Pipeline>,
    defaults: LogMetadata,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("app_name", &self.pipeline.process.app_name)
            .field("queue_len", &self.pipeline.queue.len())
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Build a logger over explicit buffer and sink implementations.
    pub fn new(
        config: LoggerConfig,
        buffer: Arc<dyn IntermediateBuffer>,
        sink: Arc<dyn RelationalSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pipeline: Arc::new(Pipeline::new(config, buffer, sink)),
            defaults: LogMetadata::new(),
        })
    }

    /// Build a logger over Redis and PostgreSQL from `config`.
    ///
    /// No connection is made here; both tiers connect on first use. Must be
    /// called within a Tokio runtime.
    pub fn connect(config: LoggerConfig) -> Result<Self> {
        let buffer = RedisBuffer::new(config.buffer.clone())?;
        let sink = PgLogSink::connect_lazy_with_config(&config.database_url, config.pool.clone())?;
        Self::new(config, Arc::new(buffer), Arc::new(sink))
    }

    /// [`connect`](Self::connect) with [`LoggerConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::connect(LoggerConfig::from_env()?)
    }

    /// Probe both tiers and start the background flush task.
    ///
    /// Returns whether both tiers answered. The logger runs either way:
    /// entries wait in memory until the buffer is reachable. Calling this
    /// again re-probes without starting a second task.
    pub async fn initialize(&self) -> bool {
        let (buffer_ok, sink_ok) = tokio::join!(
            async {
                match self.pipeline.buffer.connect().await {
                    Ok(()) => self.pipeline.buffer.ping().await,
                    Err(_) => false,
                }
            },
            self.pipeline.sink.ping()
        );

        if !self.pipeline.is_closed() && !self.pipeline.has_background() {
            let task = FlushTask::spawn(
                Arc::downgrade(&self.pipeline),
                self.pipeline.config.flush_interval,
            );
            if let Some(previous) = self.pipeline.install_background(task) {
                previous.stop().await;
            }
        }

        if buffer_ok && sink_ok {
            info!(
                subsystem = "pipeline",
                app_name = %self.pipeline.process.app_name,
                environment = %self.pipeline.process.environment,
                "Logger initialized"
            );
        } else {
            warn!(
                subsystem = "pipeline",
                buffer_ok,
                sink_ok,
                "Logger initialized with unreachable tiers, entries held in memory"
            );
        }
        let _ = self
            .pipeline
            .events
            .send(PipelineEvent::Started { buffer_ok, sink_ok });
        buffer_ok && sink_ok
    }

    /// A logger whose calls carry `defaults` merged under their own metadata.
    ///
    /// Call-site values win over the child's defaults, which win over the
    /// parent's.
    pub fn child(&self, defaults: LogMetadata) -> Logger {
        Logger {
            pipeline: Arc::clone(&self.pipeline),
            defaults: defaults.merged(&self.defaults),
        }
    }

    /// Default metadata carried by this handle.
    pub fn defaults(&self) -> &LogMetadata {
        &self.defaults
    }

    /// Record a console-only entry. Warn and Error still persist.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, metadata: LogMetadata) {
        self.record(level, message.into(), LogType::ConsoleOnly, metadata);
    }

    /// Record an entry destined for `request_logs` (or `error_logs` when
    /// `level` is Warn/Error).
    pub fn log_request(&self, level: LogLevel, message: impl Into<String>, metadata: LogMetadata) {
        self.record(level, message.into(), LogType::Request, metadata);
    }

    /// Record an entry destined for `error_logs`.
    pub fn log_error(&self, level: LogLevel, message: impl Into<String>, metadata: LogMetadata) {
        self.record(level, message.into(), LogType::Error, metadata);
    }

    pub fn debug(&self, message: impl Into<String>, metadata: LogMetadata) {
        self.log(LogLevel::Debug, message, metadata);
    }

    pub fn info(&self, message: impl Into<String>, metadata: LogMetadata) {
        self.log(LogLevel::Info, message, metadata);
    }

    /// Warnings are persisted to `error_logs`.
    pub fn warn(&self, message: impl Into<String>, metadata: LogMetadata) {
        self.log_error(LogLevel::Warn, message, metadata);
    }

    pub fn error(&self, message: impl Into<String>, metadata: LogMetadata) {
        self.log_error(LogLevel::Error, message, metadata);
    }

    /// Record `err` at Error level with its type and source chain attached.
    pub fn error_from<E: std::error::Error>(
        &self,
        message: impl Into<String>,
        err: &E,
        metadata: LogMetadata,
    ) {
        let metadata = metadata.merged(&LogMetadata::new().with_error(ErrorDetails::from_error(err)));
        self.error(message, metadata);
    }

    fn record(&self, level: LogLevel, message: String, log_type: LogType, metadata: LogMetadata) {
        let entry = LogEntry::new(level, message, log_type, metadata.merged(&self.defaults));
        console::emit(&entry);
        if entry.is_durable() {
            self.pipeline.accept(entry);
        }
    }

    /// Move the Entry Queue into the buffer now.
    ///
    /// Returns [`FlushOutcome::InProgress`] without waiting when another
    /// flush holds the guard.
    pub async fn flush(&self) -> FlushOutcome {
        self.pipeline.try_flush_queue(FlushTrigger::Manual).await
    }

    /// Flush the Entry Queue and drain the buffer into the sink, waiting for
    /// any in-flight flush to finish first.
    pub async fn flush_all(&self) -> FlushReport {
        self.pipeline.flush_all().await
    }

    /// Probe both tiers. Never fails.
    pub async fn health_check(&self) -> HealthReport {
        let (intermediate_buffer, relational_sink) =
            tokio::join!(self.pipeline.buffer.ping(), self.pipeline.sink.ping());
        HealthReport {
            intermediate_buffer,
            relational_sink,
            entry_queue: true,
        }
    }

    /// Stop the background task, flush everything, and disconnect both
    /// tiers, in that order.
    ///
    /// Idempotent: later calls return an empty report. Entries logged after
    /// shutdown are emitted to the console only.
    pub async fn shutdown(&self) -> FlushReport {
        if !self.pipeline.close() {
            return FlushReport::default();
        }

        if let Some(task) = self.pipeline.take_background() {
            task.stop().await;
        }

        let report = self.pipeline.flush_all().await;

        self.pipeline.buffer.disconnect().await;
        self.pipeline.sink.close().await;

        info!(
            subsystem = "pipeline",
            entry_count = report.drain.fetched,
            rows_inserted = report.drain.rows_written(),
            remaining = self.pipeline.queue.len(),
            "Logger shut down"
        );
        let _ = self.pipeline.events.send(PipelineEvent::Stopped);
        report
    }

    /// Subscribe to pipeline events.
    pub fn events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.pipeline.events.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.pipeline.stats.snapshot()
    }

    /// Entries waiting in the open Entry Queue. Never above the configured
    /// cap with Debug/Info entries.
    pub fn queue_len(&self) -> usize {
        self.pipeline.queue.len()
    }

    /// Entries already sealed into batches and waiting for their flush.
    pub fn sealed_len(&self) -> usize {
        self.pipeline.queue.sealed_len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.pipeline.is_closed()
    }
}
