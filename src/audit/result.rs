//! Request and result types for audit operations

use crate::state::{AnalysisStatus, FetchStatus, PageStatus};
use crate::storage::{AuditRun, StatusCounts};

/// Parameters of a new audit run
///
/// Unset caps fall back to the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    pub project_id: String,
    pub root_url: String,
    pub max_pages_discovered: Option<usize>,
    pub max_pages_to_analyze: Option<usize>,
    /// Sitemap tried before any declared in robots.txt
    pub sitemap_url: Option<String>,
}

impl AuditRequest {
    pub fn new(project_id: impl Into<String>, root_url: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            root_url: root_url.into(),
            ..Default::default()
        }
    }

    pub fn max_pages_discovered(mut self, max: usize) -> Self {
        self.max_pages_discovered = Some(max);
        self
    }

    pub fn max_pages_to_analyze(mut self, max: usize) -> Self {
        self.max_pages_to_analyze = Some(max);
        self
    }

    pub fn sitemap_url(mut self, url: impl Into<String>) -> Self {
        self.sitemap_url = Some(url.into());
        self
    }
}

/// Totals returned by `run_audit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditResult {
    pub run_id: i64,
    pub discovered: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Totals returned by `scan_more_pages`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanMorePagesResult {
    pub analyzed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Outcome of processing one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageProcessingResult {
    pub page_id: i64,
    pub url: String,
    pub discovery_order: i64,
    pub status: PageStatus,
    pub fetch_status: FetchStatus,
    pub analysis_status: AnalysisStatus,
    pub score: Option<u8>,
    pub issue_count: usize,
    pub error: Option<String>,
}

impl PageProcessingResult {
    pub fn is_analyzed(&self) -> bool {
        self.status == PageStatus::Analyzed
    }
}

/// Outcome of one `analyze_batch` call
///
/// `skipped` counts pages handed to the batch that were no longer claimed
/// for analysis when their turn came.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub analyzed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Per-page results in discovery order
    pub pages: Vec<PageProcessingResult>,
}

impl BatchSummary {
    /// Counts a page outcome; `None` means the page was no longer claimed
    pub(crate) fn record(&mut self, result: Option<PageProcessingResult>) {
        let Some(result) = result else {
            self.skipped += 1;
            return;
        };
        match result.status {
            PageStatus::Analyzed => self.analyzed += 1,
            PageStatus::Failed => self.failed += 1,
            _ => {}
        }
        self.pages.push(result);
    }
}

/// A run and its page counts
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatus {
    pub run: AuditRun,
    pub counts: StatusCounts,
}
