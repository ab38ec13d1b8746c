//! Pipeline Orchestrator
//!
//! Drives one request through
//! `RECEIVED -> AUTHORIZED -> GENERATED -> EXECUTED -> LOGGED -> RESPONDED`.
//! Schema resolution and the read check run before any external call or
//! audit write. Every attempt that reaches generation leaves exactly one
//! audit record, written before the caller sees a result.

pub mod response;

pub use response::{
    ErrorResponse, HistoryEntry, HistoryResponse, ProfileResponse, QueryResponse, StatsResponse, TableStat,
};

use crate::audit::{AuditLog, NewAuditRecord};
use crate::catalog::{SchemaCatalog, SchemaDescriptor};
use crate::config::{PipelineConfig, DEFAULT_HISTORY_LIMIT};
use crate::error::{PipelineError, Result};
use crate::execution::{QueryExecutor, SqliteStoreProvider, StoreProvider};
use crate::generator::QueryGenerator;
use crate::llm::GenerationCapability;
use crate::security::{default_permissions, permissions_from_json, AccessController, AccessMode, Principal};
use response::round_millis;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct QueryPipeline {
    catalog: Arc<SchemaCatalog>,
    access: Arc<AccessController>,
    generator: QueryGenerator,
    executor: QueryExecutor,
    audit: AuditLog,
    history_max_limit: usize,
}

impl QueryPipeline {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        access: Arc<AccessController>,
        generator: QueryGenerator,
        executor: QueryExecutor,
        audit: AuditLog,
    ) -> Self {
        Self {
            catalog,
            access,
            generator,
            executor,
            audit,
            history_max_limit: PipelineConfig::default().history_max_limit,
        }
    }

    pub fn with_history_max_limit(mut self, limit: usize) -> Self {
        self.history_max_limit = limit.max(1);
        self
    }

    /// Wire the built-in catalog, configured permissions, SQLite stores and
    /// audit store around an injected generation capability.
    pub async fn from_config(config: &PipelineConfig, capability: Arc<dyn GenerationCapability>) -> Result<Self> {
        let catalog = Arc::new(SchemaCatalog::builtin());

        let permissions = match &config.permissions_file {
            Some(path) => {
                info!("Loading permissions from {}", path.display());
                permissions_from_json(&std::fs::read_to_string(path)?)?
            }
            None => default_permissions(),
        };
        let access = Arc::new(AccessController::new(&catalog, permissions)?);

        let stores: Arc<dyn StoreProvider> = Arc::new(SqliteStoreProvider::from_dir(
            &config.databases_dir,
            catalog.schemas().iter().map(|s| s.key.as_str()),
            config.store_read_only,
        ));
        let executor = QueryExecutor::new(stores, config.execution_timeout);
        let generator = QueryGenerator::new(capability, config.generation_timeout);
        let audit = AuditLog::open(&config.audit_database_url).await?;

        Ok(Self::new(catalog, access, generator, executor, audit)
            .with_history_max_limit(config.history_max_limit))
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Shared evaluator, for explicit permission reloads
    pub fn access(&self) -> &Arc<AccessController> {
        &self.access
    }

    /// Resolve the schema, then require `mode` on it
    fn authorized_schema(&self, principal: &Principal, schema_name: &str, mode: AccessMode) -> Result<&SchemaDescriptor> {
        let schema = self.catalog.resolve(schema_name).map_err(|e| {
            warn!("Unknown schema '{}' requested by '{}'", schema_name, principal.id);
            e
        })?;
        self.access.authorize(principal, &schema.key, mode).map_err(|e| {
            warn!("Denied {:?} on '{}' for principal '{}'", mode, schema.name, principal.id);
            e
        })?;
        Ok(schema)
    }

    pub async fn run_query(&self, principal: &Principal, question: &str, schema_name: &str) -> Result<QueryResponse> {
        if question.trim().is_empty() || schema_name.trim().is_empty() {
            return Err(PipelineError::BadRequest(
                "Query and database name are required".to_string(),
            ));
        }
        info!("Query received from '{}' for '{}'", principal.id, schema_name);

        let schema = self.authorized_schema(principal, schema_name, AccessMode::Read)?;
        let description = schema.describe();

        let generated = match self.generator.generate(question, &description, &schema.name).await {
            Ok(generated) => generated,
            Err(failure) => {
                warn!("Generation failed ({:?}) on '{}': {}", failure.kind, schema.name, failure.reason);
                let record = self
                    .audit
                    .record(NewAuditRecord {
                        principal_id: principal.id.clone(),
                        natural_language_query: question.to_string(),
                        generated_sql: String::new(),
                        schema_name: schema.name.clone(),
                        execution_time_seconds: None,
                        row_count: 0,
                        error_message: Some(failure.reason.clone()),
                    })
                    .await?;
                debug!("Logged failed generation as {}", record.id);
                return Err(PipelineError::Generation(failure.reason));
            }
        };

        let result = self.executor.execute(&generated.sql, &schema.key).await;
        let seconds = result.elapsed.as_secs_f64();

        let record = self
            .audit
            .record(NewAuditRecord {
                principal_id: principal.id.clone(),
                natural_language_query: question.to_string(),
                generated_sql: generated.sql.clone(),
                schema_name: schema.name.clone(),
                execution_time_seconds: Some(seconds),
                row_count: result.row_count,
                error_message: result.failure_reason.clone(),
            })
            .await?;
        info!(
            "Query on '{}' logged as {} (success={}, rows={})",
            schema.name, record.id, record.success, record.row_count
        );

        if let Some(reason) = result.failure_reason {
            return Err(PipelineError::Execution(reason));
        }

        Ok(QueryResponse {
            success: true,
            sql_query: generated.sql,
            explanation: generated.explanation,
            columns: result.columns,
            data: result.rows,
            row_count: result.row_count,
            execution_time: round_millis(seconds),
        })
    }

    /// The principal's own records, newest first. A schema filter is
    /// matched by any accepted spelling of a catalog name.
    pub async fn history(
        &self,
        principal: &Principal,
        schema_filter: Option<&str>,
        limit: Option<usize>,
    ) -> Result<HistoryResponse> {
        let filter = schema_filter.map(|name| match self.catalog.resolve(name) {
            Ok(schema) => schema.name.clone(),
            Err(_) => name.to_string(),
        });
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(self.history_max_limit);

        let records = self.audit.history(&principal.id, filter.as_deref(), limit).await?;
        Ok(HistoryResponse {
            success: true,
            history: records.into_iter().map(HistoryEntry::from).collect(),
        })
    }

    pub async fn stats(&self, principal: &Principal, schema_name: &str) -> Result<StatsResponse> {
        let schema = self.authorized_schema(principal, schema_name, AccessMode::Read)?;

        let counts = self
            .executor
            .count_rows(&schema.key, &schema.table_names())
            .await
            .map_err(|e| match e {
                // A stalled count is a store problem, not the caller's
                PipelineError::Execution(reason) => PipelineError::Store(reason),
                other => other,
            })?;

        Ok(StatsResponse {
            success: true,
            database_name: schema.name.clone(),
            tables: counts
                .into_iter()
                .map(|(table, row_count)| TableStat { table, row_count })
                .collect(),
        })
    }

    pub fn schema(&self, principal: &Principal, schema_name: &str) -> Result<SchemaDescriptor> {
        Ok(self.authorized_schema(principal, schema_name, AccessMode::Read)?.clone())
    }

    pub fn databases(&self, principal: &Principal) -> Vec<String> {
        self.access.accessible_schemas(principal)
    }

    pub fn profile(&self, principal: &Principal) -> ProfileResponse {
        ProfileResponse {
            id: principal.id.clone(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role.map(|r| r.as_str().to_string()),
            role_name: principal.role.map(|r| r.display_name().to_string()),
            accessible_databases: self.databases(principal),
        }
    }
}
