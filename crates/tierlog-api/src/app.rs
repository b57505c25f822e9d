//! HTTP router, request logging middleware and handlers.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use tierlog_core::{LogLevel, LogMetadata, RequestContext};
use tierlog_pipeline::Logger;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub logger: Logger,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            request_logging_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

/// Level for a completed request: 5xx is Error, 4xx is Warn.
fn level_for_status(status: StatusCode) -> LogLevel {
    if status.is_server_error() {
        LogLevel::Error
    } else if status.is_client_error() {
        LogLevel::Warn
    } else {
        LogLevel::Info
    }
}

fn header_str(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Bind a request-scoped child logger and record one entry per response.
async fn request_logging_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let scope = RequestContext {
        request_id: header_str(&request, REQUEST_ID_HEADER),
        method: Some(method.clone()),
        path: Some(path.clone()),
        ip: header_str(&request, "x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string())),
        user_agent: header_str(&request, "user-agent"),
        ..Default::default()
    };
    let logger = state
        .logger
        .child(LogMetadata::new().with_request(scope));
    request.extensions_mut().insert(logger.clone());

    let response = next.run(request).await;

    let status = response.status();
    let completion = RequestContext {
        status_code: Some(status.as_u16()),
        duration_ms: Some(start.elapsed().as_millis() as u64),
        ..Default::default()
    };
    logger.log_request(
        level_for_status(status),
        format!("{} {} {}", method, path, status.as_u16()),
        LogMetadata::new().with_request(completion),
    );
    response
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Per-tier reachability; 503 when either tier is down.
async fn health_check(Extension(logger): Extension<Logger>) -> impl IntoResponse {
    let report = logger.health_check().await;
    let (code, status) = if report.is_healthy() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "components": report,
        })),
    )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not_found" })),
    )
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "stats": state.logger.stats(),
        "queueLen": state.logger.queue_len(),
        "sealedLen": state.logger.sealed_len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use tierlog_core::{MemoryBuffer, MemorySink};
    use tierlog_pipeline::LoggerConfig;
    use tower::ServiceExt;

    fn test_app() -> (Router, Logger, Arc<MemoryBuffer>, Arc<MemorySink>) {
        let buffer = Arc::new(MemoryBuffer::new());
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(
            LoggerConfig::default().with_app_name("api-test"),
            buffer.clone(),
            sink.clone(),
        )
        .unwrap();
        let app = router(AppState {
            logger: logger.clone(),
        });
        (app, logger, buffer, sink)
    }

    fn get_request(uri: &str) -> Request {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_level_for_status() {
        assert_eq!(level_for_status(StatusCode::OK), LogLevel::Info);
        assert_eq!(level_for_status(StatusCode::FOUND), LogLevel::Info);
        assert_eq!(level_for_status(StatusCode::NOT_FOUND), LogLevel::Warn);
        assert_eq!(
            level_for_status(StatusCode::SERVICE_UNAVAILABLE),
            LogLevel::Error
        );
    }

    #[tokio::test]
    async fn test_request_is_logged_with_correlation_id() {
        let (app, logger, _buffer, sink) = test_app();

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert!(header_id.is_some());

        logger.flush_all().await;
        let stored = sink.request_logs().await;
        assert_eq!(stored.len(), 1);

        let request = stored[0].entry.metadata().request.clone().unwrap();
        assert_eq!(request.method.as_deref(), Some("GET"));
        assert_eq!(request.path.as_deref(), Some("/"));
        assert_eq!(request.status_code, Some(200));
        assert!(request.duration_ms.is_some());
        assert_eq!(request.request_id, header_id);
    }

    #[tokio::test]
    async fn test_client_error_goes_to_error_table() {
        let (app, logger, _buffer, sink) = test_app();

        let response = app.oneshot(get_request("/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        logger.flush_all().await;
        assert!(sink.request_logs().await.is_empty());
        let errors = sink.error_logs().await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entry.level(), LogLevel::Warn);
    }

    #[tokio::test]
    async fn test_health_ok_when_tiers_reachable() {
        let (app, _logger, _buffer, _sink) = test_app();

        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_degraded_when_buffer_down() {
        let (app, _logger, buffer, _sink) = test_app();
        buffer.set_online(false);

        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["components"]["intermediateBuffer"], false);
        assert_eq!(json["components"]["relationalSink"], true);
        assert_eq!(json["components"]["entryQueue"], true);
    }
}
