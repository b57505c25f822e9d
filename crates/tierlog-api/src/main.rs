//! HTTP host for the tierlog pipeline.
//!
//! Builds the logger from the environment, logs every request through a
//! request-scoped child logger, and on Ctrl-C/SIGTERM stops accepting
//! connections before flushing and disconnecting the pipeline.

mod app;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use tracing::{info, warn};

use tierlog_cache::RedisBuffer;
use tierlog_db::PgLogSink;
use tierlog_pipeline::{shutdown_signal, Logger, LoggerConfig};

use crate::app::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _file_guard = telemetry::init_tracing();

    let config = LoggerConfig::from_env()?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = listen_port(std::env::var("PORT").ok())?;

    let buffer = RedisBuffer::new(config.buffer.clone())?;
    let sink = PgLogSink::connect_lazy_with_config(&config.database_url, config.pool.clone())?;

    // Migration failure is not fatal; the sink degrades until the schema exists
    info!("Running database migrations...");
    match sink.migrate().await {
        Ok(()) => info!("Database migrations complete"),
        Err(e) => warn!(error = %e, "Database migrations failed"),
    }

    let logger = Logger::new(config, Arc::new(buffer), Arc::new(sink))?;
    if !logger.initialize().await {
        warn!("Starting with unreachable log tiers, entries held in memory");
    }

    let app = app::router(AppState {
        logger: logger.clone(),
    });

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = logger.shutdown().await;
    info!(
        rows_inserted = report.drain.rows_written(),
        remaining = logger.queue_len(),
        "Server stopped"
    );
    Ok(())
}

/// `PORT` when set, else 3000. A malformed value is an error.
fn listen_port(value: Option<String>) -> anyhow::Result<u16> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT value {raw:?}")),
        None => Ok(3000),
    }
}
