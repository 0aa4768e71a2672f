//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::analysis::PageAnalysis;
use crate::state::{PageStatus, RunPhase};
use crate::storage::{
    AssetAudit, AuditRun, LinkAudit, NewPage, NewRun, Page, PageAnalysisRecord, PagePatch,
    PerformanceAudit, StatusCounts,
};
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Store errors are run-scoped: they always propagate to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Page {page_id} cannot move from {from} to {to}")]
    InvalidTransition {
        page_id: i64,
        from: PageStatus,
        to: PageStatus,
    },

    #[error("Page {url} already exists in run {run_id}")]
    DuplicatePage { run_id: i64, url: String },

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Rejects a status change the page state machine does not allow
pub(crate) fn check_transition(page_id: i64, from: PageStatus, to: PageStatus) -> StoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition { page_id, from, to })
    }
}

/// Trait for storage backend implementations
///
/// Every write is scoped to one run or one page by ID. Callers share a
/// backend behind a mutex (see `SharedStore`), so methods take `&mut self`
/// for writes.
pub trait AuditStore: Send {
    // ===== Run Management =====

    /// Creates a new audit run in the DISCOVERING phase
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, run: &NewRun) -> StoreResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StoreResult<AuditRun>;

    /// Sets the phase of a run
    fn update_run_phase(&mut self, run_id: i64, phase: RunPhase) -> StoreResult<()>;

    /// Marks a run IDLE and records when the latest batch finished
    fn finish_run(&mut self, run_id: i64) -> StoreResult<()>;

    /// Marks a run IDLE with a run-level error
    fn fail_run(&mut self, run_id: i64, error: &str) -> StoreResult<()>;

    // ===== Page Management =====

    /// Creates pages for a run in one transaction, all PENDING
    ///
    /// Either every page is created or none is.
    ///
    /// # Returns
    ///
    /// The new page IDs, in input order
    fn create_pages(&mut self, run_id: i64, pages: &[NewPage]) -> StoreResult<Vec<i64>>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StoreResult<Page>;

    /// Lists pages of a run by ascending discovery order
    ///
    /// # Arguments
    ///
    /// * `run_id` - The run
    /// * `status` - Only pages in this status, or all pages when None
    /// * `limit` - At most this many pages, or all when None
    fn list_pages(
        &self,
        run_id: i64,
        status: Option<PageStatus>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Page>>;

    /// Applies a partial update to a page
    ///
    /// A status change must be allowed by the page state machine, otherwise
    /// `StoreError::InvalidTransition` is returned and nothing is written.
    fn update_page(&mut self, page_id: i64, patch: &PagePatch) -> StoreResult<()>;

    /// Atomically moves up to `limit` PENDING pages to ANALYZING
    ///
    /// Pages are chosen by ascending discovery order. Two callers never
    /// receive the same page.
    ///
    /// # Returns
    ///
    /// The claimed pages (now ANALYZING), in discovery order
    fn claim_pending_pages(&mut self, run_id: i64, limit: usize) -> StoreResult<Vec<Page>>;

    /// Atomically moves one PENDING page to ANALYZING
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - The claimed page
    /// * `Err(StoreError::InvalidTransition)` - The page is not PENDING
    fn claim_page(&mut self, page_id: i64) -> StoreResult<Page>;

    /// Returns one page to PENDING with no results
    ///
    /// Fetch and analysis outcomes and the last error are cleared, and the
    /// page's analysis, link, asset and performance rows are deleted. A page
    /// that is already PENDING only has its results cleared.
    fn reset_page(&mut self, page_id: i64) -> StoreResult<Page>;

    /// Resets every page of a run in `from` back to PENDING
    ///
    /// Fetch and analysis outcomes and the last error are cleared, and the
    /// pages' analysis, link, asset and performance rows are deleted.
    ///
    /// # Returns
    ///
    /// The number of pages reset
    fn reset_pages(&mut self, run_id: i64, from: PageStatus) -> StoreResult<usize>;

    /// Counts a run's pages per status
    fn count_pages_by_status(&self, run_id: i64) -> StoreResult<StatusCounts>;

    // ===== Analysis Results =====

    /// Saves a page's analysis, replacing any previous one
    fn save_page_analysis(&mut self, page_id: i64, analysis: &PageAnalysis) -> StoreResult<()>;

    /// Gets a page's analysis, if it has one
    fn get_page_analysis(&self, page_id: i64) -> StoreResult<Option<PageAnalysisRecord>>;

    /// Lists every analysis of a run, by page discovery order
    fn list_analyses(&self, run_id: i64) -> StoreResult<Vec<PageAnalysisRecord>>;

    // ===== Link / Asset / Performance Audits =====

    /// Replaces a page's link rows; all rows are stored under `page_id`
    fn save_link_audits(&mut self, page_id: i64, links: &[LinkAudit]) -> StoreResult<()>;

    /// Replaces a page's asset rows; all rows are stored under `page_id`
    fn save_asset_audits(&mut self, page_id: i64, assets: &[AssetAudit]) -> StoreResult<()>;

    /// Replaces a page's performance row
    fn save_performance_audit(&mut self, audit: &PerformanceAudit) -> StoreResult<()>;

    /// Lists a page's link rows in extraction order
    fn list_link_audits(&self, page_id: i64) -> StoreResult<Vec<LinkAudit>>;

    /// Lists a page's asset rows in extraction order
    fn list_asset_audits(&self, page_id: i64) -> StoreResult<Vec<AssetAudit>>;

    /// Gets a page's performance row, if it has one
    fn get_performance_audit(&self, page_id: i64) -> StoreResult<Option<PerformanceAudit>>;
}
