//! PostgreSQL implementation of [`RelationalSink`].

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info};

use tierlog_core::defaults::MAX_ROWS_PER_INSERT;
use tierlog_core::{Destination, ExtendedEntry, HealthState, RelationalSink, Result, SinkHealth};

use crate::pool::{create_lazy_pool, log_pool_metrics, PoolConfig};
use crate::rows::{ErrorLogRow, RequestLogRow};

/// Relational sink writing to `request_logs` and `error_logs`.
pub struct PgLogSink {
    pool: PgPool,
    health: HealthState,
}

impl PgLogSink {
    /// Create a sink on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            health: HealthState::new(),
        }
    }

    /// Create a sink whose pool connects on first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        Self::connect_lazy_with_config(database_url, PoolConfig::default())
    }

    pub fn connect_lazy_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        Ok(Self::new(create_lazy_pool(database_url, config)?))
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| tierlog_core::Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    async fn insert_request_rows(&self, rows: Vec<RequestLogRow>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(MAX_ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO request_logs ({}) ",
                RequestLogRow::COLUMNS
            ));
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.common.id)
                    .push_bind(row.common.timestamp)
                    .push_bind(row.common.level)
                    .push_bind(&row.common.message)
                    .push_bind(&row.method)
                    .push_bind(&row.request_path)
                    .push_bind(row.status_code)
                    .push_bind(row.duration_ms)
                    .push_bind(&row.user_id)
                    .push_bind(&row.request_id)
                    .push_bind(&row.trace_id)
                    .push_bind(&row.ip)
                    .push_bind(&row.user_agent)
                    .push_bind(&row.common.hostname)
                    .push_bind(row.common.pid)
                    .push_bind(&row.common.app_name)
                    .push_bind(&row.common.environment)
                    .push_bind(&row.common.metadata);
            });
            builder.push(" ON CONFLICT (id) DO NOTHING");

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_error_rows(&self, rows: Vec<ErrorLogRow>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(MAX_ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO error_logs ({}) ",
                ErrorLogRow::COLUMNS
            ));
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.common.id)
                    .push_bind(row.common.timestamp)
                    .push_bind(row.common.level)
                    .push_bind(&row.common.message)
                    .push_bind(&row.error_name)
                    .push_bind(&row.error_message)
                    .push_bind(&row.stack_trace)
                    .push_bind(&row.component)
                    .push_bind(&row.request_id)
                    .push_bind(&row.user_id)
                    .push_bind(&row.common.hostname)
                    .push_bind(row.common.pid)
                    .push_bind(&row.common.app_name)
                    .push_bind(&row.common.environment)
                    .push_bind(&row.common.metadata);
            });
            builder.push(" ON CONFLICT (id) DO NOTHING");

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Turn a write result into the trait's "count or 0" contract.
    fn settle(
        &self,
        destination: Destination,
        attempted: usize,
        start: Instant,
        result: Result<u64>,
    ) -> usize {
        match result {
            Ok(inserted) => {
                self.health.mark_connected();
                debug!(
                    subsystem = "sink",
                    component = "postgres",
                    op = "insert",
                    db_table = destination.table_name(),
                    entry_count = attempted,
                    rows_inserted = inserted,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Stored log batch"
                );
                inserted as usize
            }
            Err(e) => {
                self.health.record_write_failure();
                error!(
                    subsystem = "sink",
                    component = "postgres",
                    op = "insert",
                    db_table = destination.table_name(),
                    entry_count = attempted,
                    error = %e,
                    "Failed to store log batch; entries dropped"
                );
                0
            }
        }
    }
}

#[async_trait]
impl RelationalSink for PgLogSink {
    async fn store_request_logs(&self, entries: &[ExtendedEntry]) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let start = Instant::now();
        let rows = entries.iter().map(RequestLogRow::from_entry).collect();
        let result = self.insert_request_rows(rows).await;
        self.settle(Destination::RequestLogs, entries.len(), start, result)
    }

    async fn store_error_logs(&self, entries: &[ExtendedEntry]) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let start = Instant::now();
        let rows = entries.iter().map(ErrorLogRow::from_entry).collect();
        let result = self.insert_error_rows(rows).await;
        self.settle(Destination::ErrorLogs, entries.len(), start, result)
    }

    async fn ping(&self) -> bool {
        let ok = match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                debug!(subsystem = "sink", component = "postgres", error = %e, "Probe failed");
                false
            }
        };
        self.health.record(ok);
        if ok {
            log_pool_metrics(&self.pool);
        }
        ok
    }

    fn health(&self) -> SinkHealth {
        self.health.get()
    }

    fn write_failures(&self) -> u64 {
        self.health.write_failures()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(
            subsystem = "sink",
            component = "postgres",
            op = "close",
            "Database pool closed"
        );
    }
}
