//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Site-Audit database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One audit of one site
CREATE TABLE IF NOT EXISTS audit_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    root_url TEXT NOT NULL,
    max_pages_discovered INTEGER NOT NULL,
    max_pages_to_analyze INTEGER NOT NULL,
    phase TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    last_error TEXT
);

-- Discovered pages, one per normalized URL per run
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES audit_runs(id),
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    fetch_status TEXT NOT NULL,
    analysis_status TEXT NOT NULL,
    discovery_order INTEGER NOT NULL,
    discovered_at TEXT NOT NULL,
    analyzed_at TEXT,
    last_error TEXT,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_run_status_order ON pages(run_id, status, discovery_order);
CREATE INDEX IF NOT EXISTS idx_pages_run_order ON pages(run_id, discovery_order);

-- Analyzer verdicts, at most one per page
CREATE TABLE IF NOT EXISTS page_analyses (
    page_id INTEGER PRIMARY KEY REFERENCES pages(id),
    score INTEGER NOT NULL,
    metadata_snapshot TEXT NOT NULL,
    analyzer TEXT NOT NULL,
    analyzed_at TEXT NOT NULL
);

-- Issues owned by a verdict
CREATE TABLE IF NOT EXISTS page_issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_analyses(page_id),
    position INTEGER NOT NULL,
    issue_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_issues_page ON page_issues(page_id);

-- Links found on a page
CREATE TABLE IF NOT EXISTS link_audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    href TEXT NOT NULL,
    anchor_text TEXT NOT NULL,
    is_internal INTEGER NOT NULL,
    nofollow INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_link_audits_page ON link_audits(page_id);

-- Images, scripts and stylesheets referenced by a page
CREATE TABLE IF NOT EXISTS asset_audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    src TEXT NOT NULL,
    alt TEXT,
    kind TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_asset_audits_page ON asset_audits(page_id);

-- Response timing and size, at most one per page
CREATE TABLE IF NOT EXISTS performance_audits (
    page_id INTEGER PRIMARY KEY REFERENCES pages(id),
    status_code INTEGER NOT NULL,
    response_time_ms INTEGER NOT NULL,
    content_length INTEGER,
    html_bytes INTEGER NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = vec![
            "audit_runs",
            "pages",
            "page_analyses",
            "page_issues",
            "link_audits",
            "asset_audits",
            "performance_audits",
        ];

        for table in tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
