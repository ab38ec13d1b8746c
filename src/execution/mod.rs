//! Execution Module
//!
//! - `store`: the store collaborator contract and its SQLite implementation
//! - `executor`: timed, timeout-bounded statement execution

pub mod executor;
pub mod store;

pub use executor::{ExecutionResult, QueryExecutor};
pub use store::{Row, SqliteStoreProvider, StoreError, StoreHandle, StoreProvider, TabularData};
