//! Response payloads
//!
//! Schema-level shapes returned to callers. Field names follow the JSON
//! the gateway has always emitted.

use crate::audit::AuditRecord;
use crate::error::{Classification, ErrorKind, PipelineError};
use crate::execution::Row;
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub sql_query: String,
    pub explanation: String,
    pub columns: Vec<String>,
    pub data: Vec<Row>,
    pub row_count: usize,
    /// Seconds, millisecond precision
    pub execution_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
    pub classification: Classification,
}

impl ErrorResponse {
    pub fn status_code(&self) -> u16 {
        self.classification.status_code()
    }
}

impl From<&PipelineError> for ErrorResponse {
    fn from(err: &PipelineError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::InternalFailure {
            error!("Internal failure: {}", err);
        }
        Self {
            success: false,
            error: err.public_message(),
            kind,
            classification: kind.classification(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub question: String,
    pub sql_query: String,
    pub database_name: String,
    pub row_count: i64,
    pub execution_time: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    /// RFC 3339
    pub created_at: String,
}

impl From<AuditRecord> for HistoryEntry {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id.to_string(),
            question: record.natural_language_query,
            sql_query: record.generated_sql,
            database_name: record.schema_name,
            row_count: record.row_count,
            execution_time: record.execution_time_seconds,
            success: record.success,
            error_message: record.error_message,
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStat {
    pub table: String,
    pub row_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub database_name: String,
    /// Catalog-declared table order
    pub tables: Vec<TableStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<String>,
    pub role_name: Option<String>,
    pub accessible_databases: Vec<String>,
}

pub(crate) fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_error_response_shape() {
        let resp = ErrorResponse::from(&PipelineError::Unauthorized(
            "You do not have access to this database".into(),
        ));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "unauthorized");
        assert_eq!(json["classification"], "forbidden");
        assert_eq!(json["error"], "You do not have access to this database");
        assert_eq!(resp.status_code(), 403);

        let resp = ErrorResponse::from(&PipelineError::Store("disk full".into()));
        assert_eq!(resp.status_code(), 500);
        assert!(!resp.error.contains("disk full"));
    }

    #[test]
    fn test_history_entry_from_record() {
        let record = AuditRecord {
            id: Uuid::nil(),
            principal_id: "analyst".into(),
            natural_language_query: "how many doctors".into(),
            generated_sql: "SELECT COUNT(*) FROM doctors".into(),
            schema_name: "Hospital Management".into(),
            execution_time_seconds: Some(0.002),
            row_count: 1,
            success: true,
            error_message: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
                + chrono::Duration::milliseconds(250),
        };
        let entry = HistoryEntry::from(record);
        assert_eq!(entry.database_name, "Hospital Management");
        assert_eq!(entry.created_at, "2024-03-01T12:30:00.250Z");
        assert_eq!(entry.question, "how many doctors");
    }

    #[test]
    fn test_round_millis() {
        assert_eq!(round_millis(0.0123456), 0.012);
        assert_eq!(round_millis(1.9996), 2.0);
    }
}
