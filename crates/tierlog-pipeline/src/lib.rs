//! # tierlog-pipeline
//!
//! The tiered logger: console first, then an in-process Entry Queue, then a
//! Redis buffer, then PostgreSQL.
//!
//! ```rust,ignore
//! use tierlog_pipeline::{Logger, LoggerConfig};
//! use tierlog_core::{LogLevel, LogMetadata};
//!
//! let logger = Logger::connect(LoggerConfig::from_env()?)?;
//! logger.initialize().await;
//!
//! logger.info("cache warmed", LogMetadata::new());
//! logger.log_request(LogLevel::Info, "GET /items", meta);
//!
//! tierlog_pipeline::shutdown_signal().await;
//! logger.shutdown().await;
//! ```
//!
//! ## Environment
//!
//! See [`LoggerConfig::from_env`].

pub mod config;
mod console;
pub mod events;
mod flusher;
pub mod lifecycle;
pub mod logger;
mod pipeline;
pub mod queue;
pub mod stats;

pub use config::LoggerConfig;
pub use events::{DrainReport, FlushOutcome, FlushReport, FlushTrigger, PipelineEvent};
pub use lifecycle::shutdown_signal;
pub use logger::Logger;
pub use queue::{EnqueueOutcome, EntryQueue, Requeued};
pub use stats::StatsSnapshot;
