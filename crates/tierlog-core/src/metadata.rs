//! Structured metadata attached to log entries.
//!
//! Known context is grouped into typed records (request, user, error,
//! performance, business). Anything else goes into the untyped `extra` map.
//!
//! Merging is field-by-field: a field set on the call wins over the same
//! field in the defaults of a child logger, unset fields fall back to the
//! defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// HTTP request context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

impl RequestContext {
    fn merged(self, defaults: &Self) -> Self {
        Self {
            request_id: self.request_id.or_else(|| defaults.request_id.clone()),
            method: self.method.or_else(|| defaults.method.clone()),
            path: self.path.or_else(|| defaults.path.clone()),
            status_code: self.status_code.or(defaults.status_code),
            duration_ms: self.duration_ms.or(defaults.duration_ms),
            ip: self.ip.or_else(|| defaults.ip.clone()),
            user_agent: self.user_agent.or_else(|| defaults.user_agent.clone()),
            trace_id: self.trace_id.or_else(|| defaults.trace_id.clone()),
            span_id: self.span_id.or_else(|| defaults.span_id.clone()),
        }
    }
}

/// Authenticated user context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserContext {
    fn merged(self, defaults: &Self) -> Self {
        Self {
            user_id: self.user_id.or_else(|| defaults.user_id.clone()),
            session_id: self.session_id.or_else(|| defaults.session_id.clone()),
            role: self.role.or_else(|| defaults.role.clone()),
        }
    }
}

/// Details of an error being reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetails {
    /// Capture an error value: short type name, display message and the
    /// `source()` chain as the stack.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let full_name = std::any::type_name::<E>();
        let name = full_name
            .split('<')
            .next()
            .and_then(|path| path.rsplit("::").next())
            .unwrap_or(full_name);

        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self {
            name: Some(name.to_string()),
            message: Some(err.to_string()),
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
            code: None,
        }
    }

    fn merged(self, defaults: &Self) -> Self {
        Self {
            name: self.name.or_else(|| defaults.name.clone()),
            message: self.message.or_else(|| defaults.message.clone()),
            stack: self.stack.or_else(|| defaults.stack.clone()),
            code: self.code.or_else(|| defaults.code.clone()),
        }
    }
}

/// Performance counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_query_count: Option<u32>,
}

impl PerformanceMetrics {
    fn merged(self, defaults: &Self) -> Self {
        Self {
            duration_ms: self.duration_ms.or(defaults.duration_ms),
            memory_bytes: self.memory_bytes.or(defaults.memory_bytes),
            db_query_count: self.db_query_count.or(defaults.db_query_count),
        }
    }
}

/// Domain context: which component did what to which resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl BusinessContext {
    fn merged(self, defaults: &Self) -> Self {
        Self {
            component: self.component.or_else(|| defaults.component.clone()),
            action: self.action.or_else(|| defaults.action.clone()),
            resource: self.resource.or_else(|| defaults.resource.clone()),
            resource_id: self.resource_id.or_else(|| defaults.resource_id.clone()),
        }
    }
}

/// Metadata attached to a log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessContext>,
    /// Free-form data with no dedicated field.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, JsonValue>,
}

impl LogMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_none()
            && self.user.is_none()
            && self.error.is_none()
            && self.performance.is_none()
            && self.business.is_none()
            && self.extra.is_empty()
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_error(mut self, error: ErrorDetails) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_performance(mut self, performance: PerformanceMetrics) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn with_business(mut self, business: BusinessContext) -> Self {
        self.business = Some(business);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Shorthand for `request.request_id`.
    pub fn request_id(&self) -> Option<&str> {
        self.request.as_ref()?.request_id.as_deref()
    }

    /// Shorthand for `user.user_id`.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref()?.user_id.as_deref()
    }

    /// Fill every unset field from `defaults`.
    pub fn merged(self, defaults: &LogMetadata) -> LogMetadata {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra);

        LogMetadata {
            request: merge_group(self.request, &defaults.request, RequestContext::merged),
            user: merge_group(self.user, &defaults.user, UserContext::merged),
            error: merge_group(self.error, &defaults.error, ErrorDetails::merged),
            performance: merge_group(
                self.performance,
                &defaults.performance,
                PerformanceMetrics::merged,
            ),
            business: merge_group(self.business, &defaults.business, BusinessContext::merged),
            extra,
        }
    }
}

fn merge_group<T: Clone>(
    own: Option<T>,
    defaults: &Option<T>,
    merge: impl FnOnce(T, &T) -> T,
) -> Option<T> {
    match (own, defaults) {
        (Some(own), Some(defaults)) => Some(merge(own, defaults)),
        (Some(own), None) => Some(own),
        (None, defaults) => defaults.clone(),
    }
}
