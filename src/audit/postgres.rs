//! PostgreSQL-backed audit store

use crate::audit::{AuditRecord, AuditStore};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!("Connected to PostgreSQL audit store");
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS query_logs (
                seq BIGSERIAL PRIMARY KEY,
                id UUID NOT NULL UNIQUE,
                principal_id TEXT NOT NULL,
                natural_language_query TEXT NOT NULL,
                generated_sql TEXT NOT NULL,
                schema_name TEXT NOT NULL,
                execution_time_seconds DOUBLE PRECISION,
                row_count BIGINT NOT NULL,
                success BOOLEAN NOT NULL,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_query_logs_principal ON query_logs (principal_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn from_row(row: &PgRow) -> std::result::Result<AuditRecord, sqlx::Error> {
    Ok(AuditRecord {
        id: row.try_get::<Uuid, _>("id")?,
        principal_id: row.try_get("principal_id")?,
        natural_language_query: row.try_get("natural_language_query")?,
        generated_sql: row.try_get("generated_sql")?,
        schema_name: row.try_get("schema_name")?,
        execution_time_seconds: row.try_get("execution_time_seconds")?,
        row_count: row.try_get("row_count")?,
        success: row.try_get("success")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO query_logs (
                id, principal_id, natural_language_query, generated_sql, schema_name,
                execution_time_seconds, row_count, success, error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.principal_id)
        .bind(&record.natural_language_query)
        .bind(&record.generated_sql)
        .bind(&record.schema_name)
        .bind(record.execution_time_seconds)
        .bind(record.row_count)
        .bind(record.success)
        .bind(&record.error_message)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history(
        &self,
        principal_id: &str,
        schema_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, principal_id, natural_language_query, generated_sql, schema_name,
                   execution_time_seconds, row_count, success, error_message, created_at
            FROM query_logs
            WHERE principal_id = $1 AND ($2::TEXT IS NULL OR schema_name = $2)
            ORDER BY created_at DESC, seq DESC
            LIMIT $3
            "#,
        )
        .bind(principal_id)
        .bind(schema_name)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let records = rows.iter().map(from_row).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
