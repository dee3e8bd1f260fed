//! SQLite store implementation

use crate::store::schema::initialize_schema;
use crate::store::traits::{Store, StoreError, StoreResult};
use crate::store::StoreStats;
use crate::model::JobRecord;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const JOB_COLUMNS: &str = "id, external_id, site_key, title, company, location, salary, \
     description, requirements, additional_details, url, first_seen, last_seen, \
     is_new, is_relevant, is_processed, fingerprint, created_at, updated_at";

/// SQLite store backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a database at the given path
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    let details_json: String = row.get(9)?;
    let additional_details: BTreeMap<String, String> = serde_json::from_str(&details_json)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(JobRecord {
        id: row.get(0)?,
        external_id: row.get(1)?,
        site_key: row.get(2)?,
        title: row.get(3)?,
        company: row.get(4)?,
        location: row.get(5)?,
        salary: row.get(6)?,
        description: row.get(7)?,
        requirements: row.get(8)?,
        additional_details,
        url: row.get(10)?,
        first_seen: row.get(11)?,
        last_seen: row.get(12)?,
        is_new: row.get(13)?,
        is_relevant: row.get(14)?,
        is_processed: row.get(15)?,
        fingerprint: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn details_to_json(details: &BTreeMap<String, String>) -> StoreResult<String> {
    serde_json::to_string(details).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl Store for SqliteStore {
    fn find_by_key(&self, external_id: &str, site_key: &str) -> StoreResult<Option<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE external_id = ?1 AND site_key = ?2",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let job = stmt
            .query_row(params![external_id, site_key], row_to_job)
            .optional()?;
        Ok(job)
    }

    fn create(&mut self, record: &JobRecord) -> StoreResult<i64> {
        let details = details_to_json(&record.additional_details)?;
        self.conn.execute(
            "INSERT INTO jobs (external_id, site_key, title, company, location, salary,
             description, requirements, additional_details, url, first_seen, last_seen,
             is_new, is_relevant, is_processed, fingerprint, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                record.external_id,
                record.site_key,
                record.title,
                record.company,
                record.location,
                record.salary,
                record.description,
                record.requirements,
                details,
                record.url,
                record.first_seen,
                record.last_seen,
                record.is_new,
                record.is_relevant,
                record.is_processed,
                record.fingerprint,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, record: &JobRecord) -> StoreResult<()> {
        let details = details_to_json(&record.additional_details)?;
        let changed = self.conn.execute(
            "UPDATE jobs SET title = ?1, company = ?2, location = ?3, salary = ?4,
             description = ?5, requirements = ?6, additional_details = ?7, url = ?8,
             first_seen = ?9, last_seen = ?10, is_new = ?11, is_relevant = ?12,
             is_processed = ?13, fingerprint = ?14, updated_at = ?15
             WHERE id = ?16",
            params![
                record.title,
                record.company,
                record.location,
                record.salary,
                record.description,
                record.requirements,
                details,
                record.url,
                record.first_seen,
                record.last_seen,
                record.is_new,
                record.is_relevant,
                record.is_processed,
                record.fingerprint,
                record.updated_at,
                record.id,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::JobNotFound(record.id));
        }
        Ok(())
    }

    fn new_jobs_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE is_new = 1 AND first_seen >= ?1 ORDER BY first_seen",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![since], row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn mark_not_new(&mut self, ids: &[i64]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        for id in ids {
            tx.execute("UPDATE jobs SET is_new = 0 WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn set_relevant(&mut self, id: i64, is_relevant: bool) -> StoreResult<()> {
        let now = Utc::now();
        let changed = self.conn.execute(
            "UPDATE jobs SET is_relevant = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_relevant, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    fn set_processed(&mut self, id: i64, is_processed: bool) -> StoreResult<()> {
        let now = Utc::now();
        let changed = self.conn.execute(
            "UPDATE jobs SET is_processed = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_processed, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    fn unprocessed_relevant(&self) -> StoreResult<Vec<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE is_relevant = 1 AND is_processed = 0",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn delete_stale(&mut self, days: u32) -> StoreResult<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let deleted = self.conn.execute(
            "DELETE FROM jobs WHERE first_seen < ?1 AND is_relevant = 0",
            params![cutoff],
        )?;
        Ok(deleted)
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let count = |sql: &str| -> StoreResult<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let total = count("SELECT COUNT(*) FROM jobs")?;
        let new = count("SELECT COUNT(*) FROM jobs WHERE is_new = 1")?;
        let relevant = count("SELECT COUNT(*) FROM jobs WHERE is_relevant = 1")?;
        let processed = count("SELECT COUNT(*) FROM jobs WHERE is_processed = 1")?;

        let mut stmt = self
            .conn
            .prepare("SELECT site_key, COUNT(*) FROM jobs GROUP BY site_key")?;
        let mut by_site = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (site, n) = row?;
            by_site.insert(site, n as u64);
        }

        Ok(StoreStats {
            total,
            new,
            relevant,
            processed,
            by_site,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(external_id: &str, site_key: &str) -> JobRecord {
        let now = Utc::now();
        JobRecord {
            id: 0,
            external_id: external_id.to_string(),
            site_key: site_key.to_string(),
            title: "Data Engineer".to_string(),
            company: Some("Acme".to_string()),
            location: Some("Remote".to_string()),
            salary: None,
            description: Some("Build pipelines".to_string()),
            requirements: None,
            additional_details: BTreeMap::new(),
            url: Some("https://example.com/jobs/1".to_string()),
            first_seen: now,
            last_seen: now,
            is_new: true,
            is_relevant: false,
            is_processed: false,
            fingerprint: "abc123".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_and_find() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id = store.create(&sample_job("j1", "hirebase")).unwrap();
        assert!(id > 0);

        let found = store.find_by_key("j1", "hirebase").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.title, "Data Engineer");
        assert_eq!(found.company.as_deref(), Some("Acme"));
        assert!(found.is_new);
    }

    #[test]
    fn test_find_missing_is_none() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.find_by_key("nope", "hirebase").unwrap().is_none());
    }

    #[test]
    fn test_natural_key_scoped_by_site() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.create(&sample_job("j1", "hirebase")).unwrap();
        store.create(&sample_job("j1", "other")).unwrap();

        assert!(store.find_by_key("j1", "hirebase").unwrap().is_some());
        assert!(store.find_by_key("j1", "other").unwrap().is_some());
    }

    #[test]
    fn test_update_overwrites_content() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id = store.create(&sample_job("j1", "hirebase")).unwrap();

        let mut job = store.find_by_key("j1", "hirebase").unwrap().unwrap();
        job.salary = Some("$100k".to_string());
        job.fingerprint = "def456".to_string();
        store.update(&job).unwrap();

        let reloaded = store.find_by_key("j1", "hirebase").unwrap().unwrap();
        assert_eq!(reloaded.id, id);
        assert_eq!(reloaded.salary.as_deref(), Some("$100k"));
        assert_eq!(reloaded.fingerprint, "def456");
    }

    #[test]
    fn test_update_missing_row_errors() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut job = sample_job("j1", "hirebase");
        job.id = 999;
        assert!(matches!(
            store.update(&job),
            Err(StoreError::JobNotFound(999))
        ));
    }

    #[test]
    fn test_additional_details_roundtrip() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut job = sample_job("j1", "hirebase");
        job.additional_details
            .insert("visa".to_string(), "sponsored".to_string());
        job.additional_details
            .insert("team".to_string(), "platform".to_string());
        store.create(&job).unwrap();

        let found = store.find_by_key("j1", "hirebase").unwrap().unwrap();
        assert_eq!(
            found.additional_details.get("visa").map(String::as_str),
            Some("sponsored")
        );
        assert_eq!(found.additional_details.len(), 2);
    }

    #[test]
    fn test_mark_not_new() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id1 = store.create(&sample_job("j1", "hirebase")).unwrap();
        let id2 = store.create(&sample_job("j2", "hirebase")).unwrap();

        store.mark_not_new(&[id1, id2]).unwrap();

        assert!(!store.find_by_key("j1", "hirebase").unwrap().unwrap().is_new);
        assert!(!store.find_by_key("j2", "hirebase").unwrap().unwrap().is_new);
    }

    #[test]
    fn test_new_jobs_since() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.create(&sample_job("j1", "hirebase")).unwrap();

        let before = Utc::now() - Duration::hours(1);
        let new_jobs = store.new_jobs_since(before).unwrap();
        assert_eq!(new_jobs.len(), 1);

        let after = Utc::now() + Duration::hours(1);
        assert!(store.new_jobs_since(after).unwrap().is_empty());
    }

    #[test]
    fn test_relevance_and_processing_flags() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id = store.create(&sample_job("j1", "hirebase")).unwrap();

        store.set_relevant(id, true).unwrap();
        let pending = store.unprocessed_relevant().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);

        store.set_processed(id, true).unwrap();
        assert!(store.unprocessed_relevant().unwrap().is_empty());
    }

    #[test]
    fn test_delete_stale_spares_relevant_and_recent() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let mut old = sample_job("old", "hirebase");
        old.first_seen = Utc::now() - Duration::days(60);
        store.create(&old).unwrap();

        let mut old_relevant = sample_job("keeper", "hirebase");
        old_relevant.first_seen = Utc::now() - Duration::days(60);
        old_relevant.is_relevant = true;
        store.create(&old_relevant).unwrap();

        store.create(&sample_job("fresh", "hirebase")).unwrap();

        let deleted = store.delete_stale(30).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_by_key("old", "hirebase").unwrap().is_none());
        assert!(store.find_by_key("keeper", "hirebase").unwrap().is_some());
        assert!(store.find_by_key("fresh", "hirebase").unwrap().is_some());
    }

    #[test]
    fn test_stats() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id1 = store.create(&sample_job("j1", "hirebase")).unwrap();
        store.create(&sample_job("j2", "hirebase")).unwrap();
        store.create(&sample_job("j3", "other")).unwrap();

        store.set_relevant(id1, true).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.new, 3);
        assert_eq!(stats.relevant, 1);
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.by_site.get("hirebase"), Some(&2));
        assert_eq!(stats.by_site.get("other"), Some(&1));
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        {
            let mut store = SqliteStore::new(&path).unwrap();
            store.create(&sample_job("j1", "hirebase")).unwrap();
        }

        // Reopen and verify persistence
        let store = SqliteStore::new(&path).unwrap();
        assert!(store.find_by_key("j1", "hirebase").unwrap().is_some());
    }
}
