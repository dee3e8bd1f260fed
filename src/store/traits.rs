//! Store trait and error types

use crate::model::JobRecord;
use crate::store::StoreStats;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: id {0}")]
    JobNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for job store backends.
///
/// The store never decides what counts as a change; that is the dedup
/// engine's job. It only persists and queries records.
pub trait Store {
    /// Looks up a job by its natural key
    fn find_by_key(&self, external_id: &str, site_key: &str) -> StoreResult<Option<JobRecord>>;

    /// Inserts a new job and returns its row id
    fn create(&mut self, record: &JobRecord) -> StoreResult<i64>;

    /// Overwrites an existing job row with the given record
    fn update(&mut self, record: &JobRecord) -> StoreResult<()>;

    /// Jobs still flagged new that were first sighted at or after `since`
    fn new_jobs_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<JobRecord>>;

    /// Clears the new flag on the given jobs
    fn mark_not_new(&mut self, ids: &[i64]) -> StoreResult<()>;

    /// Sets the relevance flag owned by downstream phases
    fn set_relevant(&mut self, id: i64, is_relevant: bool) -> StoreResult<()>;

    /// Sets the processed flag owned by downstream phases
    fn set_processed(&mut self, id: i64, is_processed: bool) -> StoreResult<()>;

    /// Jobs marked relevant but not yet processed
    fn unprocessed_relevant(&self) -> StoreResult<Vec<JobRecord>>;

    /// Deletes irrelevant jobs first sighted more than `days` days ago;
    /// returns the number of rows removed
    fn delete_stale(&mut self, days: u32) -> StoreResult<usize>;

    /// Aggregate counts over the whole store
    fn stats(&self) -> StoreResult<StoreStats>;
}
