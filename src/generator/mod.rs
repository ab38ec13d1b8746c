//! Query Generator
//!
//! Turns a natural-language question into a schema-constrained SQL
//! statement through the injected generation capability. Every failure of
//! the capability is returned as data; nothing escapes this boundary.

pub mod parser;

use crate::llm::GenerationCapability;
use parser::{parse_response, SQL_MARKER};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Line prefix the model is told to use when the schema cannot answer
pub const INFEASIBLE_MARKER: &str = "INFEASIBLE:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    pub sql: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFailureKind {
    /// Transport, quota or malformed-response error from the service
    Unavailable,
    TimedOut,
    /// The model reported the request cannot be served by the schema
    Infeasible,
    /// Nothing usable left after parsing
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    pub kind: GenerationFailureKind,
    pub reason: String,
}

impl GenerationFailure {
    fn new(kind: GenerationFailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

pub type GenerationResult = std::result::Result<GeneratedQuery, GenerationFailure>;

pub struct QueryGenerator {
    capability: Arc<dyn GenerationCapability>,
    timeout: Duration,
}

impl QueryGenerator {
    pub fn new(capability: Arc<dyn GenerationCapability>, timeout: Duration) -> Self {
        Self { capability, timeout }
    }

    /// One call to the capability, no retry
    pub async fn generate(
        &self,
        question: &str,
        schema_description: &str,
        schema_name: &str,
    ) -> GenerationResult {
        let system_prompt = build_system_prompt(schema_description, schema_name);
        debug!("Generating SQL for schema '{}': {}", schema_name, question);

        let call = self.capability.complete(&system_prompt, question);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Generation via {} failed: {}", self.capability.name(), e);
                return Err(GenerationFailure::new(GenerationFailureKind::Unavailable, e.to_string()));
            }
            Err(_) => {
                warn!("Generation via {} timed out after {:?}", self.capability.name(), self.timeout);
                return Err(GenerationFailure::new(
                    GenerationFailureKind::TimedOut,
                    format!("Generation timed out after {} seconds", self.timeout.as_secs_f64()),
                ));
            }
        };

        let result = interpret_response(&response, schema_name);
        if let Ok(ref query) = result {
            info!(
                "Generated SQL ({} chars) for schema '{}'",
                query.sql.len(),
                schema_name
            );
        }
        result
    }
}

pub fn build_system_prompt(schema_description: &str, schema_name: &str) -> String {
    format!(
        r#"You are an expert SQL developer. Your task is to convert natural language queries into SQL queries.

You are working with a {schema_name} database with the following schema:

{schema_description}

Rules:
1. Generate only valid SQL queries
2. Use proper SQL syntax
3. Use explicit JOINs when more than one table is needed
4. Use meaningful table aliases
5. Format the SQL query for readability
6. Provide a brief explanation of what the query does
7. If the query is ambiguous, make reasonable assumptions
8. Always return valid SQL that can be executed by SQLite
9. Only use tables and columns listed in the schema above. If the request cannot be answered with this schema, reply with a single line starting with "{INFEASIBLE_MARKER}" followed by a short reason, and nothing else

Return your response in the following format:
{SQL_MARKER}
[Your SQL query here]

EXPLANATION:
[Brief explanation of what the query does]"#
    )
}

/// Classify a raw model response. Infeasibility is only recognised when the
/// response carries no SQL section at all.
pub fn interpret_response(response: &str, schema_name: &str) -> GenerationResult {
    if !response.contains(SQL_MARKER) {
        if let Some(reason) = response.trim().strip_prefix(INFEASIBLE_MARKER) {
            return Err(GenerationFailure::new(
                GenerationFailureKind::Infeasible,
                format!(
                    "Request cannot be answered with the {} schema: {}",
                    schema_name,
                    reason.trim()
                ),
            ));
        }
    }

    let parsed = parse_response(response);
    if parsed.sql.is_empty() {
        return Err(GenerationFailure::new(
            GenerationFailureKind::Empty,
            "Model declined or returned an empty query",
        ));
    }

    Ok(GeneratedQuery {
        sql: parsed.sql,
        explanation: parsed.explanation,
    })
}
