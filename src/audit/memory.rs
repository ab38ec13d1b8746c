use crate::audit::{AuditRecord, AuditStore};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// Append-only in-process store
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record in append order
    pub fn records(&self) -> Result<Vec<AuditRecord>> {
        self.records
            .read()
            .map(|records| records.clone())
            .map_err(|_| PipelineError::Audit("audit store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| PipelineError::Audit("audit store lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }

    async fn history(
        &self,
        principal_id: &str,
        schema_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| PipelineError::Audit("audit store lock poisoned".to_string()))?;

        // Later appends first; the stable sort keeps that for equal timestamps
        let mut matching: Vec<AuditRecord> = records
            .iter()
            .rev()
            .filter(|r| r.principal_id == principal_id)
            .filter(|r| schema_name.map_or(true, |s| r.schema_name == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
