//! Database schema definitions
//!
//! This module contains the SQL schema for the jobsift database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Canonical job postings, one row per (external_id, site_key)
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL,
    site_key TEXT NOT NULL,
    title TEXT NOT NULL,
    company TEXT,
    location TEXT,
    salary TEXT,
    description TEXT,
    requirements TEXT,
    additional_details TEXT NOT NULL DEFAULT '{}',
    url TEXT,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    is_new INTEGER NOT NULL DEFAULT 1,
    is_relevant INTEGER NOT NULL DEFAULT 0,
    is_processed INTEGER NOT NULL DEFAULT 0,
    fingerprint TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(external_id, site_key)
);

CREATE INDEX IF NOT EXISTS idx_jobs_site_key ON jobs(site_key);
CREATE INDEX IF NOT EXISTS idx_jobs_first_seen ON jobs(first_seen);
CREATE INDEX IF NOT EXISTS idx_jobs_last_seen ON jobs(last_seen);
CREATE INDEX IF NOT EXISTS idx_jobs_is_new ON jobs(is_new);
CREATE INDEX IF NOT EXISTS idx_jobs_is_relevant ON jobs(is_relevant);
CREATE INDEX IF NOT EXISTS idx_jobs_is_processed ON jobs(is_processed);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_natural_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let insert = "INSERT INTO jobs (external_id, site_key, title, fingerprint, first_seen, last_seen, created_at, updated_at)
                      VALUES ('abc', 'hirebase', 'Engineer', 'f', 'now', 'now', 'now', 'now')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());

        // Same external id on another site is fine
        conn.execute(
            "INSERT INTO jobs (external_id, site_key, title, fingerprint, first_seen, last_seen, created_at, updated_at)
             VALUES ('abc', 'other', 'Engineer', 'f', 'now', 'now', 'now', 'now')",
            [],
        )
        .unwrap();
    }
}
