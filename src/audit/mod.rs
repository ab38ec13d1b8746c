//! Audit Log
//!
//! One immutable record per accepted pipeline attempt, appended after
//! execution (or generation failure) and before the response is returned.
//! Records are never updated; retrieval is per principal, newest first.
//!
//! Stores:
//! - `memory`: process-local, used by tests and `AUDIT_DATABASE_URL=memory`
//! - `sqlite`: single-file store (default)
//! - `postgres`: shared store selected by a `postgres://` URL

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::InMemoryAuditStore;
pub use postgres::PostgresAuditStore;
pub use sqlite::SqliteAuditStore;

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub principal_id: String,
    pub natural_language_query: String,
    pub generated_sql: String,
    /// Display name of the schema the attempt ran against
    pub schema_name: String,
    /// Absent when generation failed and nothing was executed
    pub execution_time_seconds: Option<f64>,
    pub row_count: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything about an attempt except the identity and timestamp the log
/// assigns. `success` is derived: an attempt succeeded iff it carries no
/// error message.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub principal_id: String,
    pub natural_language_query: String,
    pub generated_sql: String,
    pub schema_name: String,
    pub execution_time_seconds: Option<f64>,
    pub row_count: usize,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<()>;

    /// Records of one principal, newest first, at most `limit`
    async fn history(
        &self,
        principal_id: &str,
        schema_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>>;

    fn name(&self) -> &str;
}

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Select a store from a location string: `memory`, a `postgres://`
    /// URL, or otherwise a SQLite file path.
    pub async fn open(location: &str) -> Result<Self> {
        let location = location.trim();
        let store: Arc<dyn AuditStore> = if location.eq_ignore_ascii_case("memory") {
            Arc::new(InMemoryAuditStore::new())
        } else if location.starts_with("postgres://") || location.starts_with("postgresql://") {
            Arc::new(PostgresAuditStore::connect(location).await?)
        } else {
            Arc::new(SqliteAuditStore::open(location)?)
        };
        info!("Audit log using {} store", store.name());
        Ok(Self { store })
    }

    /// Append one record. The returned copy is what was persisted.
    pub async fn record(&self, entry: NewAuditRecord) -> Result<AuditRecord> {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            success: entry.error_message.is_none(),
            principal_id: entry.principal_id,
            natural_language_query: entry.natural_language_query,
            generated_sql: entry.generated_sql,
            schema_name: entry.schema_name,
            execution_time_seconds: entry.execution_time_seconds,
            row_count: entry.row_count as i64,
            error_message: entry.error_message,
            created_at: Utc::now(),
        };

        self.store
            .append(&record)
            .await
            .map_err(|e| PipelineError::Audit(format!("Failed to write audit record: {}", e)))?;
        debug!(
            "Audit record {} written for principal '{}' (success={})",
            record.id, record.principal_id, record.success
        );
        Ok(record)
    }

    pub async fn history(
        &self,
        principal_id: &str,
        schema_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>> {
        self.store
            .history(principal_id, schema_name, limit)
            .await
            .map_err(|e| PipelineError::Audit(format!("Failed to read audit history: {}", e)))
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(principal: &str, error: Option<&str>) -> NewAuditRecord {
        NewAuditRecord {
            principal_id: principal.to_string(),
            natural_language_query: "how many customers".to_string(),
            generated_sql: "SELECT COUNT(*) FROM customers".to_string(),
            schema_name: "E-Commerce".to_string(),
            execution_time_seconds: Some(0.004),
            row_count: 1,
            error_message: error.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_record_derives_success_and_identity() {
        let log = AuditLog::open("memory").await.unwrap();
        let ok = log.record(entry("analyst", None)).await.unwrap();
        let failed = log.record(entry("analyst", Some("no such table"))).await.unwrap();

        assert!(ok.success);
        assert!(!failed.success);
        assert_ne!(ok.id, failed.id);
        assert_eq!(log.store_name(), "memory");

        let history = log.history("analyst", None, 10).await.unwrap();
        assert_eq!(history, vec![failed, ok]);
    }

    #[tokio::test]
    async fn test_open_selects_sqlite_for_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.db");
        let log = AuditLog::open(path.to_str().unwrap()).await.unwrap();
        assert_eq!(log.store_name(), "sqlite");
        log.record(entry("viewer", None)).await.unwrap();
        assert!(path.exists());
    }
}
