//! Query Executor
//!
//! Runs a generated statement against the store of one schema. The
//! statement is passed through untouched; store errors come back as data.

use crate::error::{PipelineError, Result};
use crate::execution::store::{Row, StoreHandle, StoreProvider, TabularData};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub failure_reason: Option<String>,
    /// Wall-clock time of the statement itself, connection setup excluded
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn success(data: TabularData, elapsed: Duration) -> Self {
        Self {
            row_count: data.rows.len(),
            columns: data.columns,
            rows: data.rows,
            failure_reason: None,
            elapsed,
        }
    }

    pub fn failure(reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            failure_reason: Some(reason.into()),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_reason.is_none()
    }
}

pub struct QueryExecutor {
    stores: Arc<dyn StoreProvider>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(stores: Arc<dyn StoreProvider>, timeout: Duration) -> Self {
        Self { stores, timeout }
    }

    pub async fn execute(&self, sql: &str, schema_key: &str) -> ExecutionResult {
        let handle = match self.stores.open(schema_key) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Store for '{}' unavailable: {}", schema_key, e);
                return ExecutionResult::failure(e.to_string(), Duration::ZERO);
            }
        };

        let sql = sql.to_string();
        let started = Instant::now();
        let outcome = self.run_blocking(handle, move |handle| handle.query(&sql)).await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(data)) => ExecutionResult::success(data, elapsed),
            Ok(Err(e)) => ExecutionResult::failure(e.to_string(), elapsed),
            Err(e) => ExecutionResult::failure(e.to_string(), elapsed),
        };

        match &result.failure_reason {
            None => info!(
                "Executed on '{}': {} rows in {:.1}ms",
                schema_key,
                result.row_count,
                elapsed.as_secs_f64() * 1000.0
            ),
            Some(reason) => warn!("Execution on '{}' failed: {}", schema_key, reason),
        }
        result
    }

    /// Row count of every listed table, in the given order
    pub async fn count_rows(&self, schema_key: &str, tables: &[String]) -> Result<Vec<(String, i64)>> {
        let handle = self.stores.open(schema_key)?;
        let tables = tables.to_vec();

        let counts = self
            .run_blocking(handle, move |handle| {
                let mut counts = Vec::with_capacity(tables.len());
                for table in tables {
                    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
                    let data = handle.query(&sql)?;
                    let count = data
                        .rows
                        .first()
                        .and_then(|row| row.first())
                        .and_then(|v| v.as_i64())
                        .unwrap_or(0);
                    counts.push((table, count));
                }
                Ok::<_, crate::execution::store::StoreError>(counts)
            })
            .await?;

        Ok(counts?)
    }

    /// Run `work` on the blocking pool under the executor timeout. On
    /// timeout the running statement is interrupted; the handle is dropped
    /// (closed) inside the task either way.
    async fn run_blocking<T, F>(&self, handle: Box<dyn StoreHandle>, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Box<dyn StoreHandle>) -> T + Send + 'static,
    {
        let interrupter = handle.interrupter();
        let task = tokio::task::spawn_blocking(move || {
            let mut handle = handle;
            work(&mut handle)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_err)) => Err(PipelineError::Execution(format!(
                "Execution task failed: {}",
                join_err
            ))),
            Err(_) => {
                if let Some(interrupt) = interrupter {
                    interrupt();
                }
                Err(PipelineError::Execution(format!(
                    "Query exceeded the execution timeout of {} seconds",
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::store::{SqliteStoreProvider, StoreError};
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn executor(dir: &TempDir, timeout: Duration) -> QueryExecutor {
        let stores = SqliteStoreProvider::from_dir(dir.path(), ["shop"], true);
        QueryExecutor::new(Arc::new(stores), timeout)
    }

    fn seed(dir: &TempDir) {
        let conn = Connection::open(dir.path().join("shop.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (customer_id INTEGER PRIMARY KEY, country TEXT);
             CREATE TABLE orders (order_id INTEGER PRIMARY KEY);
             INSERT INTO customers (country) VALUES ('Canada'), ('Canada'), ('Peru');",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_execute_success() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let result = executor(&dir, Duration::from_secs(5))
            .execute("SELECT COUNT(*) AS cnt FROM customers WHERE country = 'Canada';", "shop")
            .await;
        assert!(result.is_success());
        assert_eq!(result.columns, vec!["cnt"]);
        assert_eq!(result.rows, vec![vec![serde_json::json!(2)]]);
        assert_eq!(result.row_count, 1);
    }

    #[tokio::test]
    async fn test_execute_empty_result_is_success() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let result = executor(&dir, Duration::from_secs(5))
            .execute("SELECT * FROM orders", "shop")
            .await;
        assert!(result.is_success());
        assert_eq!(result.row_count, 0);
        assert_eq!(result.columns, vec!["order_id"]);
    }

    #[tokio::test]
    async fn test_execute_failure_is_data() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let exec = executor(&dir, Duration::from_secs(5));

        let result = exec.execute("SELECT * FROM shipments", "shop").await;
        assert!(!result.is_success());
        assert_eq!(result.row_count, 0);
        assert!(result.failure_reason.unwrap().contains("no such table: shipments"));

        let result = exec.execute("SELECT 1", "warehouse").await;
        assert!(result.failure_reason.is_some());
    }

    #[tokio::test]
    async fn test_execute_timeout_interrupts_statement() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let runaway = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n) \
                       SELECT COUNT(*) FROM n";
        let result = executor(&dir, Duration::from_millis(100)).execute(runaway, "shop").await;
        assert!(result.failure_reason.unwrap().contains("execution timeout"));
    }

    #[tokio::test]
    async fn test_count_rows() {
        let dir = TempDir::new().unwrap();
        seed(&dir);
        let exec = executor(&dir, Duration::from_secs(5));
        let counts = exec
            .count_rows("shop", &["customers".to_string(), "orders".to_string()])
            .await
            .unwrap();
        assert_eq!(counts, vec![("customers".to_string(), 3), ("orders".to_string(), 0)]);

        let err = exec.count_rows("shop", &["missing".to_string()]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
    }

    #[test]
    fn test_store_error_mapping() {
        let err: PipelineError = StoreError::NotFound("shop".into()).into();
        assert!(matches!(err, PipelineError::SchemaNotFound(_)));
    }
}
