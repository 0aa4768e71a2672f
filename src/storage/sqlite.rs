//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the AuditStore trait.

use crate::analysis::{IssueType, PageAnalysis, PageIssue, Severity};
use crate::state::{AnalysisStatus, FetchStatus, PageStatus, RunPhase};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{check_transition, AuditStore, StoreError, StoreResult};
use crate::storage::{
    AssetAudit, AssetKind, AuditRun, LinkAudit, NewPage, NewRun, Page, PageAnalysisRecord,
    PagePatch, PerformanceAudit, StatusCounts,
};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;

const RUN_COLUMNS: &str = "id, project_id, root_url, max_pages_discovered, max_pages_to_analyze, \
     phase, config_hash, started_at, finished_at, last_error";

const PAGE_COLUMNS: &str = "id, run_id, url, status, fetch_status, analysis_status, \
     discovery_order, discovered_at, analyzed_at, last_error";

/// Per-page result tables, children before parents
const RESULT_TABLES: &[&str] = &[
    "page_issues",
    "page_analyses",
    "link_audits",
    "asset_audits",
    "performance_audits",
];

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // WAL lets `status` readers see pages while a batch writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn ensure_page(&self, page_id: i64) -> StoreResult<()> {
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT id FROM pages WHERE id = ?1", params![page_id], |row| row.get(0))
            .optional()?;
        exists.map(|_| ()).ok_or(StoreError::PageNotFound(page_id))
    }

    fn page_status(&self, page_id: i64) -> StoreResult<PageStatus> {
        let status: Option<String> = self
            .conn
            .query_row("SELECT status FROM pages WHERE id = ?1", params![page_id], |row| row.get(0))
            .optional()?;
        let status = status.ok_or(StoreError::PageNotFound(page_id))?;
        PageStatus::from_db_string(&status)
            .ok_or_else(|| StoreError::Serialization(format!("unknown page status '{}'", status)))
    }
}

/// Deletes one page's analysis and audit rows
fn delete_page_results(conn: &Connection, page_id: i64) -> rusqlite::Result<()> {
    for table in RESULT_TABLES {
        conn.execute(
            &format!("DELETE FROM {} WHERE page_id = ?1", table),
            params![page_id],
        )?;
    }
    Ok(())
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_time(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{}': {}", s, e)))
}

fn parse_optional_time(idx: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_time(idx, &s)).transpose()
}

fn parse_db_enum<T>(idx: usize, s: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(s).ok_or_else(|| conversion_error(idx, format!("unknown value '{}'", s)))
}

fn run_from_row(row: &Row) -> rusqlite::Result<AuditRun> {
    Ok(AuditRun {
        id: row.get(0)?,
        project_id: row.get(1)?,
        root_url: row.get(2)?,
        max_pages_discovered: row.get::<_, i64>(3)? as usize,
        max_pages_to_analyze: row.get::<_, i64>(4)? as usize,
        phase: parse_db_enum(5, &row.get::<_, String>(5)?, RunPhase::from_db_string)?,
        config_hash: row.get(6)?,
        started_at: parse_time(7, &row.get::<_, String>(7)?)?,
        finished_at: parse_optional_time(8, row.get(8)?)?,
        last_error: row.get(9)?,
    })
}

fn page_from_row(row: &Row) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        run_id: row.get(1)?,
        url: row.get(2)?,
        status: parse_db_enum(3, &row.get::<_, String>(3)?, PageStatus::from_db_string)?,
        fetch_status: parse_db_enum(4, &row.get::<_, String>(4)?, FetchStatus::from_db_string)?,
        analysis_status: parse_db_enum(
            5,
            &row.get::<_, String>(5)?,
            AnalysisStatus::from_db_string,
        )?,
        discovery_order: row.get(6)?,
        discovered_at: parse_time(7, &row.get::<_, String>(7)?)?,
        analyzed_at: parse_optional_time(8, row.get(8)?)?,
        last_error: row.get(9)?,
    })
}

impl AuditStore for SqliteStore {
    // ===== Run Management =====

    fn create_run(&mut self, run: &NewRun) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO audit_runs (project_id, root_url, max_pages_discovered, max_pages_to_analyze,
             phase, config_hash, started_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.project_id,
                run.root_url,
                run.max_pages_discovered as i64,
                run.max_pages_to_analyze as i64,
                RunPhase::Discovering.to_db_string(),
                run.config_hash,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StoreResult<AuditRun> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM audit_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StoreError::RunNotFound(run_id))
    }

    fn update_run_phase(&mut self, run_id: i64, phase: RunPhase) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE audit_runs SET phase = ?1 WHERE id = ?2",
            params![phase.to_db_string(), run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE audit_runs SET phase = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunPhase::Idle.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE audit_runs SET phase = ?1, finished_at = ?2, last_error = ?3 WHERE id = ?4",
            params![RunPhase::Idle.to_db_string(), now, error, run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Page Management =====

    fn create_pages(&mut self, run_id: i64, pages: &[NewPage]) -> StoreResult<Vec<i64>> {
        // Surface a missing run as RunNotFound rather than a foreign key failure
        self.get_run(run_id)?;

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(pages.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pages (run_id, url, status, fetch_status, analysis_status,
                 discovery_order, discovered_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for page in pages {
                let result = stmt.execute(params![
                    run_id,
                    page.url,
                    PageStatus::Pending.to_db_string(),
                    FetchStatus::NotFetched.to_db_string(),
                    AnalysisStatus::NotAttempted.to_db_string(),
                    page.discovery_order,
                    now
                ]);
                match result {
                    Ok(_) => ids.push(tx.last_insert_rowid()),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        return Err(StoreError::DuplicatePage {
                            run_id,
                            url: page.url.clone(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    fn get_page(&self, page_id: i64) -> StoreResult<Page> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or(StoreError::PageNotFound(page_id))
    }

    fn list_pages(
        &self,
        run_id: i64,
        status: Option<PageStatus>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Page>> {
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let pages = match status {
            Some(status) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM pages WHERE run_id = ?1 AND status = ?2
                     ORDER BY discovery_order ASC, id ASC LIMIT ?3",
                    PAGE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![run_id, status.to_db_string(), limit], page_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM pages WHERE run_id = ?1
                     ORDER BY discovery_order ASC, id ASC LIMIT ?2",
                    PAGE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![run_id, limit], page_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(pages)
    }

    fn update_page(&mut self, page_id: i64, patch: &PagePatch) -> StoreResult<()> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let transition = match patch.status {
            Some(next) => {
                let current = self.page_status(page_id)?;
                check_transition(page_id, current, next)?;
                Some((current, next))
            }
            None => None,
        };

        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Value::Text(status.to_db_string().to_string()));
        }
        if let Some(fetch_status) = patch.fetch_status {
            sets.push("fetch_status = ?");
            values.push(Value::Text(fetch_status.to_db_string().to_string()));
        }
        if let Some(analysis_status) = patch.analysis_status {
            sets.push("analysis_status = ?");
            values.push(Value::Text(analysis_status.to_db_string().to_string()));
        }
        if let Some(analyzed_at) = patch.analyzed_at {
            sets.push("analyzed_at = ?");
            values.push(match analyzed_at {
                Some(t) => Value::Text(t.to_rfc3339()),
                None => Value::Null,
            });
        }
        if let Some(last_error) = &patch.last_error {
            sets.push("last_error = ?");
            values.push(match last_error {
                Some(e) => Value::Text(e.clone()),
                None => Value::Null,
            });
        }

        if sets.is_empty() {
            return self.ensure_page(page_id);
        }

        values.push(Value::Integer(page_id));
        let mut sql = format!("UPDATE pages SET {} WHERE id = ?", sets.join(", "));
        // The status must still be the one the transition was checked against
        if let Some((current, _)) = transition {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(current.to_db_string().to_string()));
        }

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(match transition {
                Some((_, to)) => StoreError::InvalidTransition {
                    page_id,
                    from: self.page_status(page_id)?,
                    to,
                },
                None => StoreError::PageNotFound(page_id),
            });
        }
        Ok(())
    }

    fn claim_pending_pages(&mut self, run_id: i64, limit: usize) -> StoreResult<Vec<Page>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // IMMEDIATE takes the write lock up front, so a concurrent claimer
        // in another connection waits instead of selecting the same rows
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ids: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM pages WHERE run_id = ?1 AND status = ?2
                 ORDER BY discovery_order ASC, id ASC LIMIT ?3",
            )?;
            let ids = stmt
                .query_map(
                    params![run_id, PageStatus::Pending.to_db_string(), limit as i64],
                    |row| row.get(0),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let mut claimed = Vec::with_capacity(ids.len());
        {
            let mut update = tx.prepare("UPDATE pages SET status = ?1 WHERE id = ?2 AND status = ?3")?;
            let mut select = tx.prepare(&format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS))?;
            for id in ids {
                update.execute(params![
                    PageStatus::Analyzing.to_db_string(),
                    id,
                    PageStatus::Pending.to_db_string()
                ])?;
                claimed.push(select.query_row(params![id], page_from_row)?);
            }
        }
        tx.commit()?;

        Ok(claimed)
    }

    fn claim_page(&mut self, page_id: i64) -> StoreResult<Page> {
        let changed = self.conn.execute(
            "UPDATE pages SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![
                PageStatus::Analyzing.to_db_string(),
                page_id,
                PageStatus::Pending.to_db_string()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::InvalidTransition {
                page_id,
                from: self.page_status(page_id)?,
                to: PageStatus::Analyzing,
            });
        }
        self.get_page(page_id)
    }

    fn reset_page(&mut self, page_id: i64) -> StoreResult<Page> {
        let from = self.page_status(page_id)?;
        if from != PageStatus::Pending {
            check_transition(page_id, from, PageStatus::Pending)?;
        }

        let tx = self.conn.transaction()?;
        delete_page_results(&tx, page_id)?;
        tx.execute(
            "UPDATE pages SET status = ?1, fetch_status = ?2, analysis_status = ?3,
             analyzed_at = NULL, last_error = NULL
             WHERE id = ?4",
            params![
                PageStatus::Pending.to_db_string(),
                FetchStatus::NotFetched.to_db_string(),
                AnalysisStatus::NotAttempted.to_db_string(),
                page_id
            ],
        )?;
        tx.commit()?;

        self.get_page(page_id)
    }

    fn reset_pages(&mut self, run_id: i64, from: PageStatus) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        for table in RESULT_TABLES {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE page_id IN
                     (SELECT id FROM pages WHERE run_id = ?1 AND status = ?2)",
                    table
                ),
                params![run_id, from.to_db_string()],
            )?;
        }
        let changed = tx.execute(
            "UPDATE pages SET status = ?1, fetch_status = ?2, analysis_status = ?3,
             analyzed_at = NULL, last_error = NULL
             WHERE run_id = ?4 AND status = ?5",
            params![
                PageStatus::Pending.to_db_string(),
                FetchStatus::NotFetched.to_db_string(),
                AnalysisStatus::NotAttempted.to_db_string(),
                run_id,
                from.to_db_string()
            ],
        )?;
        tx.commit()?;
        Ok(changed)
    }

    fn count_pages_by_status(&self, run_id: i64) -> StoreResult<StatusCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM pages WHERE run_id = ?1 GROUP BY status")?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status = PageStatus::from_db_string(&status)
                .ok_or_else(|| StoreError::Serialization(format!("unknown page status '{}'", status)))?;
            counts.add(status, count as usize);
        }
        Ok(counts)
    }

    // ===== Analysis Results =====

    fn save_page_analysis(&mut self, page_id: i64, analysis: &PageAnalysis) -> StoreResult<()> {
        self.ensure_page(page_id)?;
        let snapshot = serde_json::to_string(&analysis.metadata_snapshot)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM page_issues WHERE page_id = ?1", params![page_id])?;
        tx.execute("DELETE FROM page_analyses WHERE page_id = ?1", params![page_id])?;
        tx.execute(
            "INSERT INTO page_analyses (page_id, score, metadata_snapshot, analyzer, analyzed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![page_id, analysis.score as i64, snapshot, analysis.analyzer, now],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO page_issues (page_id, position, issue_type, severity, message)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, issue) in analysis.issues.iter().enumerate() {
                stmt.execute(params![
                    page_id,
                    position as i64,
                    issue.issue_type.to_db_string(),
                    issue.severity.to_db_string(),
                    issue.message
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_page_analysis(&self, page_id: i64) -> StoreResult<Option<PageAnalysisRecord>> {
        let row: Option<(i64, String, String, String)> = self
            .conn
            .query_row(
                "SELECT score, metadata_snapshot, analyzer, analyzed_at
                 FROM page_analyses WHERE page_id = ?1",
                params![page_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((score, snapshot, analyzer, analyzed_at)) = row else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT issue_type, severity, message FROM page_issues
             WHERE page_id = ?1 ORDER BY position ASC",
        )?;
        let issues = stmt
            .query_map(params![page_id], |row| {
                Ok(PageIssue {
                    issue_type: parse_db_enum(0, &row.get::<_, String>(0)?, IssueType::from_db_string)?,
                    severity: parse_db_enum(1, &row.get::<_, String>(1)?, Severity::from_db_string)?,
                    message: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(PageAnalysisRecord {
            page_id,
            analysis: PageAnalysis {
                score: score.clamp(0, 100) as u8,
                issues,
                metadata_snapshot: serde_json::from_str(&snapshot)?,
                analyzer,
            },
            analyzed_at: parse_time(3, &analyzed_at)?,
        }))
    }

    fn list_analyses(&self, run_id: i64) -> StoreResult<Vec<PageAnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.page_id FROM page_analyses a JOIN pages p ON p.id = a.page_id
             WHERE p.run_id = ?1 ORDER BY p.discovery_order ASC",
        )?;
        let page_ids = stmt
            .query_map(params![run_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            if let Some(record) = self.get_page_analysis(page_id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    // ===== Link / Asset / Performance Audits =====

    fn save_link_audits(&mut self, page_id: i64, links: &[LinkAudit]) -> StoreResult<()> {
        self.ensure_page(page_id)?;
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM link_audits WHERE page_id = ?1", params![page_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO link_audits (page_id, href, anchor_text, is_internal, nofollow)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for link in links {
                stmt.execute(params![
                    page_id,
                    link.href,
                    link.anchor_text,
                    link.is_internal,
                    link.nofollow
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_asset_audits(&mut self, page_id: i64, assets: &[AssetAudit]) -> StoreResult<()> {
        self.ensure_page(page_id)?;
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM asset_audits WHERE page_id = ?1", params![page_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO asset_audits (page_id, src, alt, kind) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for asset in assets {
                stmt.execute(params![
                    page_id,
                    asset.src,
                    asset.alt,
                    asset.kind.to_db_string()
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_performance_audit(&mut self, audit: &PerformanceAudit) -> StoreResult<()> {
        self.ensure_page(audit.page_id)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO performance_audits
             (page_id, status_code, response_time_ms, content_length, html_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                audit.page_id,
                audit.status_code as i64,
                audit.response_time_ms as i64,
                audit.content_length.map(|l| l as i64),
                audit.html_bytes as i64
            ],
        )?;
        Ok(())
    }

    fn list_link_audits(&self, page_id: i64) -> StoreResult<Vec<LinkAudit>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, href, anchor_text, is_internal, nofollow
             FROM link_audits WHERE page_id = ?1 ORDER BY id ASC",
        )?;
        let links = stmt
            .query_map(params![page_id], |row| {
                Ok(LinkAudit {
                    page_id: row.get(0)?,
                    href: row.get(1)?,
                    anchor_text: row.get(2)?,
                    is_internal: row.get(3)?,
                    nofollow: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn list_asset_audits(&self, page_id: i64) -> StoreResult<Vec<AssetAudit>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, src, alt, kind FROM asset_audits WHERE page_id = ?1 ORDER BY id ASC",
        )?;
        let assets = stmt
            .query_map(params![page_id], |row| {
                Ok(AssetAudit {
                    page_id: row.get(0)?,
                    src: row.get(1)?,
                    alt: row.get(2)?,
                    kind: parse_db_enum(3, &row.get::<_, String>(3)?, AssetKind::from_db_string)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assets)
    }

    fn get_performance_audit(&self, page_id: i64) -> StoreResult<Option<PerformanceAudit>> {
        let audit = self
            .conn
            .query_row(
                "SELECT page_id, status_code, response_time_ms, content_length, html_bytes
                 FROM performance_audits WHERE page_id = ?1",
                params![page_id],
                |row| {
                    Ok(PerformanceAudit {
                        page_id: row.get(0)?,
                        status_code: row.get::<_, i64>(1)? as u16,
                        response_time_ms: row.get::<_, i64>(2)? as u64,
                        content_length: row.get::<_, Option<i64>>(3)?.map(|l| l as u64),
                        html_bytes: row.get::<_, i64>(4)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(audit)
    }
}
