//! Mapping from extended entries to relational rows.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use tierlog_core::ExtendedEntry;

/// Columns shared by both destination tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonColumns {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: &'static str,
    pub message: String,
    pub hostname: String,
    pub pid: i32,
    pub app_name: String,
    pub environment: String,
    pub metadata: JsonValue,
}

impl CommonColumns {
    fn from_entry(ext: &ExtendedEntry) -> Self {
        let entry = &ext.entry;
        Self {
            id: entry.id(),
            timestamp: entry.timestamp(),
            level: entry.level().as_str(),
            message: entry.message().to_string(),
            hostname: ext.hostname.clone(),
            pid: i32::try_from(ext.pid).unwrap_or(i32::MAX),
            app_name: ext.app_name.clone(),
            environment: ext.environment.clone(),
            metadata: serde_json::to_value(entry.metadata())
                .unwrap_or_else(|_| JsonValue::Object(Default::default())),
        }
    }
}

/// A row of `request_logs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogRow {
    pub common: CommonColumns,
    pub method: Option<String>,
    pub request_path: Option<String>,
    pub status_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub trace_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestLogRow {
    pub const COLUMNS: &'static str = "id, timestamp, level, message, method, request_path, \
         status_code, duration_ms, user_id, request_id, trace_id, ip, user_agent, \
         hostname, pid, app_name, environment, metadata";

    pub const COLUMN_COUNT: usize = 18;

    pub fn from_entry(ext: &ExtendedEntry) -> Self {
        let meta = ext.entry.metadata();
        let request = meta.request.clone().unwrap_or_default();
        let duration_ms = request
            .duration_ms
            .or_else(|| meta.performance.as_ref().and_then(|p| p.duration_ms));

        Self {
            common: CommonColumns::from_entry(ext),
            method: request.method,
            request_path: request.path,
            status_code: request.status_code.map(i32::from),
            duration_ms: duration_ms.map(|d| i64::try_from(d).unwrap_or(i64::MAX)),
            user_id: meta.user_id().map(str::to_string),
            request_id: request.request_id,
            trace_id: request.trace_id,
            ip: request.ip,
            user_agent: request.user_agent,
        }
    }
}

/// A row of `error_logs`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogRow {
    pub common: CommonColumns,
    pub error_name: Option<String>,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
    pub component: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
}

impl ErrorLogRow {
    pub const COLUMNS: &'static str = "id, timestamp, level, message, error_name, \
         error_message, stack_trace, component, request_id, user_id, \
         hostname, pid, app_name, environment, metadata";

    pub const COLUMN_COUNT: usize = 15;

    pub fn from_entry(ext: &ExtendedEntry) -> Self {
        let meta = ext.entry.metadata();
        let error = meta.error.clone().unwrap_or_default();

        Self {
            common: CommonColumns::from_entry(ext),
            error_name: error.name,
            error_message: error
                .message
                .or_else(|| Some(ext.entry.message().to_string())),
            stack_trace: error.stack,
            component: meta.business.as_ref().and_then(|b| b.component.clone()),
            request_id: meta.request_id().map(str::to_string),
            user_id: meta.user_id().map(str::to_string),
        }
    }
}
