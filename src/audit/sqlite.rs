//! SQLite-backed audit store

use crate::audit::{AuditRecord, AuditStore};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS query_logs (
    id TEXT PRIMARY KEY,
    principal_id TEXT NOT NULL,
    natural_language_query TEXT NOT NULL,
    generated_sql TEXT NOT NULL,
    schema_name TEXT NOT NULL,
    execution_time_seconds REAL,
    row_count INTEGER NOT NULL,
    success INTEGER NOT NULL,
    error_message TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_query_logs_principal
    ON query_logs (principal_id, created_at);
";

pub struct SqliteAuditStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Self::init(conn, &path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, ":memory:")
    }

    fn init(conn: Connection, location: &str) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE)?;
        info!("Audit store ready at {}", location);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `work` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| PipelineError::Audit("audit connection lock poisoned".to_string()))?;
            work(&conn)
        })
        .await
        .map_err(|e| PipelineError::Audit(format!("audit task failed: {}", e)))?
    }
}

/// Fixed-width UTC text so lexical order is chronological order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

struct StoredRow {
    id: String,
    principal_id: String,
    natural_language_query: String,
    generated_sql: String,
    schema_name: String,
    execution_time_seconds: Option<f64>,
    row_count: i64,
    success: bool,
    error_message: Option<String>,
    created_at: String,
}

impl StoredRow {
    fn into_record(self) -> Result<AuditRecord> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| PipelineError::Audit(format!("invalid record id '{}': {}", self.id, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| PipelineError::Audit(format!("invalid timestamp '{}': {}", self.created_at, e)))?
            .with_timezone(&Utc);

        Ok(AuditRecord {
            id,
            principal_id: self.principal_id,
            natural_language_query: self.natural_language_query,
            generated_sql: self.generated_sql,
            schema_name: self.schema_name,
            execution_time_seconds: self.execution_time_seconds,
            row_count: self.row_count,
            success: self.success,
            error_message: self.error_message,
            created_at,
        })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO query_logs (
                    id, principal_id, natural_language_query, generated_sql, schema_name,
                    execution_time_seconds, row_count, success, error_message, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id.to_string(),
                    record.principal_id,
                    record.natural_language_query,
                    record.generated_sql,
                    record.schema_name,
                    record.execution_time_seconds,
                    record.row_count,
                    record.success,
                    record.error_message,
                    format_timestamp(&record.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn history(
        &self,
        principal_id: &str,
        schema_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>> {
        let principal_id = principal_id.to_string();
        let schema_name = schema_name.map(str::to_string);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, principal_id, natural_language_query, generated_sql, schema_name,
                        execution_time_seconds, row_count, success, error_message, created_at
                 FROM query_logs
                 WHERE principal_id = ?1 AND (?2 IS NULL OR schema_name = ?2)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![principal_id, schema_name, limit], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    principal_id: row.get(1)?,
                    natural_language_query: row.get(2)?,
                    generated_sql: row.get(3)?,
                    schema_name: row.get(4)?,
                    execution_time_seconds: row.get(5)?,
                    row_count: row.get(6)?,
                    success: row.get(7)?,
                    error_message: row.get(8)?,
                    created_at: row.get(9)?,
                })
            })?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?.into_record()?);
            }
            Ok(records)
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
