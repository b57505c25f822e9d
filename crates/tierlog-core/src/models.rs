//! Log entry model: levels, routing types, entries and their enriched form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::LogMetadata;
use crate::{Error, Result};

// =============================================================================
// LEVEL
// =============================================================================

/// Severity of a log entry. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Warn and Error are always persisted and always flushed immediately.
    pub fn is_severe(&self) -> bool {
        *self >= LogLevel::Warn
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(Error::InvalidInput(format!("unknown log level: {other}"))),
        }
    }
}

// =============================================================================
// LOG TYPE / DESTINATION
// =============================================================================

/// Declared routing class of an entry, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    /// Request/access log, destined for `request_logs`.
    Request,
    /// Application error log, destined for `error_logs`.
    Error,
    /// Console only unless the level is Warn or above.
    #[default]
    ConsoleOnly,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Request => "request",
            LogType::Error => "error",
            LogType::ConsoleOnly => "console_only",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relational table an entry ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    RequestLogs,
    ErrorLogs,
}

impl Destination {
    pub fn table_name(&self) -> &'static str {
        match self {
            Destination::RequestLogs => "request_logs",
            Destination::ErrorLogs => "error_logs",
        }
    }
}

// =============================================================================
// ENTRY
// =============================================================================

/// A single log entry.
///
/// `id`, `timestamp` and `log_type` are assigned in [`LogEntry::new`] and
/// cannot be changed afterwards. The id is a UUIDv7 and doubles as the
/// idempotency key for the relational sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    id: Uuid,
    level: LogLevel,
    message: String,
    timestamp: DateTime<Utc>,
    log_type: LogType,
    #[serde(default, skip_serializing_if = "LogMetadata::is_empty")]
    metadata: LogMetadata,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        log_type: LogType,
        metadata: LogMetadata,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            log_type,
            metadata,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn log_type(&self) -> LogType {
        self.log_type
    }

    pub fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }

    /// Whether the entry leaves the process at all.
    pub fn is_durable(&self) -> bool {
        self.log_type != LogType::ConsoleOnly || self.level.is_severe()
    }

    /// Table the entry is routed to, or `None` for console-only entries.
    ///
    /// Severity wins over the declared type: every Warn/Error entry lands in
    /// `error_logs`, including ones logged through `log_request`.
    pub fn destination(&self) -> Option<Destination> {
        if self.level.is_severe() {
            return Some(Destination::ErrorLogs);
        }
        match self.log_type {
            LogType::Request => Some(Destination::RequestLogs),
            LogType::Error => Some(Destination::ErrorLogs),
            LogType::ConsoleOnly => None,
        }
    }
}

// =============================================================================
// PROCESS IDENTITY / EXTENDED ENTRY
// =============================================================================

/// Process-identifying fields stamped onto durable entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub hostname: String,
    pub pid: u32,
    pub app_name: String,
    pub environment: String,
}

impl ProcessInfo {
    /// Detect hostname and pid of the running process.
    pub fn detect(app_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            hostname: detect_hostname(),
            pid: std::process::id(),
            app_name: app_name.into(),
            environment: environment.into(),
        }
    }

    /// Enrich an entry for the durable path.
    pub fn extend(&self, entry: LogEntry) -> ExtendedEntry {
        ExtendedEntry {
            entry,
            hostname: self.hostname.clone(),
            pid: self.pid,
            app_name: self.app_name.clone(),
            environment: self.environment.clone(),
        }
    }
}

fn detect_hostname() -> String {
    hostname_or_system(std::env::var("HOSTNAME").ok())
}

/// `HOSTNAME` override when set, else the system hostname.
fn hostname_or_system(env_override: Option<String>) -> String {
    if let Some(name) = env_override {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A [`LogEntry`] enriched with process identity, as stored in the
/// intermediate buffer and written to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedEntry {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub hostname: String,
    pub pid: u32,
    pub app_name: String,
    pub environment: String,
}

impl ExtendedEntry {
    pub fn id(&self) -> Uuid {
        self.entry.id()
    }

    pub fn level(&self) -> LogLevel {
        self.entry.level()
    }

    pub fn destination(&self) -> Option<Destination> {
        self.entry.destination()
    }
}
