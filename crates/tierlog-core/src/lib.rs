//! # tierlog-core
//!
//! Core types, traits, and abstractions for the tierlog pipeline.
//!
//! This crate provides the log entry model, the structured metadata record,
//! the traits implemented by the intermediate buffer and the relational
//! sink, and in-process implementations of both.

pub mod defaults;
pub mod error;
pub mod health;
pub mod logging;
pub mod memory;
pub mod metadata;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use health::{HealthReport, HealthState, SinkHealth};
pub use memory::{MemoryBuffer, MemorySink};
pub use metadata::{
    BusinessContext, ErrorDetails, LogMetadata, PerformanceMetrics, RequestContext, UserContext,
};
pub use models::{Destination, ExtendedEntry, LogEntry, LogLevel, LogType, ProcessInfo};
pub use traits::{IntermediateBuffer, RelationalSink};
