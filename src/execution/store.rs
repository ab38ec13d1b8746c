//! Store collaborator
//!
//! Maps a canonical schema key to exactly one physical store and hands out
//! short-lived handles. A handle is released when dropped, so every exit
//! path of an execution closes its connection.

use crate::error::PipelineError;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub type Row = Vec<serde_json::Value>;

/// Column names plus row tuples, in store order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No store configured for schema '{0}'")]
    Unmapped(String),

    #[error("Database file not found for schema '{0}'")]
    NotFound(String),

    #[error("Failed to open store: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Query(String),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(schema) => {
                PipelineError::SchemaNotFound(format!("database file for '{}' is missing", schema))
            }
            other => PipelineError::Store(other.to_string()),
        }
    }
}

/// Cancels the statement running on a handle from another thread
pub type Interrupter = Box<dyn Fn() + Send + Sync>;

pub trait StoreHandle: Send {
    fn query(&mut self, sql: &str) -> Result<TabularData, StoreError>;

    fn interrupter(&self) -> Option<Interrupter> {
        None
    }
}

pub trait StoreProvider: Send + Sync {
    fn open(&self, schema_key: &str) -> Result<Box<dyn StoreHandle>, StoreError>;
}

/// One SQLite file per schema
pub struct SqliteStoreProvider {
    paths: HashMap<String, PathBuf>,
    read_only: bool,
}

impl SqliteStoreProvider {
    pub fn new(read_only: bool) -> Self {
        Self {
            paths: HashMap::new(),
            read_only,
        }
    }

    /// `<dir>/<key>.db` for every key
    pub fn from_dir<'a>(dir: impl AsRef<Path>, keys: impl IntoIterator<Item = &'a str>, read_only: bool) -> Self {
        let dir = dir.as_ref();
        keys.into_iter().fold(Self::new(read_only), |provider, key| {
            provider.with_store(key, dir.join(format!("{}.db", key)))
        })
    }

    pub fn with_store(mut self, schema_key: &str, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(schema_key.to_string(), path.into());
        self
    }

    fn open_flags(&self) -> OpenFlags {
        // Never create a store: a missing file is a configuration problem
        let access = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        access | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI
    }
}

impl StoreProvider for SqliteStoreProvider {
    fn open(&self, schema_key: &str) -> Result<Box<dyn StoreHandle>, StoreError> {
        let path = self
            .paths
            .get(schema_key)
            .ok_or_else(|| StoreError::Unmapped(schema_key.to_string()))?;
        if !path.exists() {
            return Err(StoreError::NotFound(schema_key.to_string()));
        }

        let conn = Connection::open_with_flags(path, self.open_flags())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        debug!("Opened store for '{}' (read_only={})", schema_key, self.read_only);
        Ok(Box::new(SqliteHandle { conn }))
    }
}

struct SqliteHandle {
    conn: Connection,
}

impl StoreHandle for SqliteHandle {
    fn query(&mut self, sql: &str) -> Result<TabularData, StoreError> {
        let query_err = |e: rusqlite::Error| StoreError::Query(e.to_string());

        let mut stmt = self.conn.prepare(sql).map_err(query_err)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(query_err)?;
        while let Some(row) = cursor.next().map_err(query_err)? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(to_json(row.get_ref(idx).map_err(query_err)?));
            }
            rows.push(values);
        }

        Ok(TabularData { columns, rows })
    }

    fn interrupter(&self) -> Option<Interrupter> {
        let handle = self.conn.get_interrupt_handle();
        Some(Box::new(move || handle.interrupt()))
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            serde_json::Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
    }
}
