use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("SQL generation failed: {0}")]
    Generation(String),

    #[error("SQL execution failed: {0}")]
    Execution(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Audit log error: {0}")]
    Audit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure taxonomy surfaced to callers. Client code branches on this,
/// never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    SchemaNotFound,
    GenerationFailure,
    ExecutionFailure,
    InternalFailure,
}

/// Coarse response classification, one per transport status family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    BadRequest,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn classification(&self) -> Classification {
        match self {
            ErrorKind::BadRequest
            | ErrorKind::GenerationFailure
            | ErrorKind::ExecutionFailure => Classification::BadRequest,
            ErrorKind::Unauthorized => Classification::Forbidden,
            ErrorKind::SchemaNotFound => Classification::NotFound,
            ErrorKind::InternalFailure => Classification::Internal,
        }
    }
}

impl Classification {
    pub fn status_code(&self) -> u16 {
        match self {
            Classification::BadRequest => 400,
            Classification::Forbidden => 403,
            Classification::NotFound => 404,
            Classification::Internal => 500,
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::BadRequest(_) => ErrorKind::BadRequest,
            PipelineError::Unauthorized(_) => ErrorKind::Unauthorized,
            PipelineError::SchemaNotFound(_) => ErrorKind::SchemaNotFound,
            PipelineError::Generation(_) => ErrorKind::GenerationFailure,
            PipelineError::Execution(_) => ErrorKind::ExecutionFailure,
            _ => ErrorKind::InternalFailure,
        }
    }

    /// Message safe to show a caller. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::InternalFailure => {
                "Internal error while processing the request".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_mapping() {
        assert_eq!(
            PipelineError::Unauthorized("no".into()).kind().classification(),
            Classification::Forbidden
        );
        assert_eq!(
            PipelineError::SchemaNotFound("x".into()).kind().classification(),
            Classification::NotFound
        );
        assert_eq!(
            PipelineError::Execution("no such table".into()).kind(),
            ErrorKind::ExecutionFailure
        );
        assert_eq!(Classification::Internal.status_code(), 500);
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = PipelineError::Audit("disk I/O error at /var/lib/audit.db".into());
        assert_eq!(err.kind(), ErrorKind::InternalFailure);
        assert!(!err.public_message().contains("/var/lib"));

        let err = PipelineError::Execution("no such table: shipments".into());
        assert!(err.public_message().contains("no such table: shipments"));
    }
}
