//! Store module for persisting harvested jobs
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Job record persistence keyed by (external_id, site_key)
//! - Lifecycle flags (new / relevant / processed) for downstream phases
//! - Stale-record cleanup and aggregate statistics

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteStore;
pub use traits::{Store, StoreError, StoreResult};

use std::collections::BTreeMap;
use std::path::Path;

/// Initializes or opens the job store at the given path
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Aggregate counts over the whole store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub new: u64,
    pub relevant: u64,
    pub processed: u64,

    /// Row counts keyed by site
    pub by_site: BTreeMap<String, u64>,
}
