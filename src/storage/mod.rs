//! Storage module for persisting audit data
//!
//! This module handles every durable record of an audit, including:
//! - Audit runs and their phase
//! - Discovered pages and their status
//! - Analyzer verdicts and their issues
//! - Link, asset and performance audit rows
//!
//! Two backends implement `AuditStore`: SQLite for real runs and an
//! in-memory map for tests and throwaway audits.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AuditStore, StoreError, StoreResult};

use crate::analysis::PageAnalysis;
use crate::state::{AnalysisStatus, FetchStatus, PageStatus, RunPhase};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// A store shared between the coordinators
pub type SharedStore = Arc<Mutex<dyn AuditStore>>;

/// Wraps a store for sharing
pub fn shared<S: AuditStore + 'static>(store: S) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Locks a shared store
///
/// A poisoned lock means a writer panicked mid-operation; it surfaces as
/// `StoreError::Poisoned` instead of panicking again.
pub fn lock_store(store: &SharedStore) -> StoreResult<MutexGuard<'_, dyn AuditStore + 'static>> {
    store.lock().map_err(|_| StoreError::Poisoned)
}

/// Opens (or creates) a SQLite store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::new(path)
}

/// One audit of one site
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRun {
    pub id: i64,
    pub project_id: String,
    pub root_url: String,
    pub max_pages_discovered: usize,
    pub max_pages_to_analyze: usize,
    pub phase: RunPhase,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Fields supplied when creating a run
#[derive(Debug, Clone)]
pub struct NewRun {
    pub project_id: String,
    pub root_url: String,
    pub max_pages_discovered: usize,
    pub max_pages_to_analyze: usize,
    pub config_hash: String,
}

/// One discovered URL belonging to a run
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub status: PageStatus,
    pub fetch_status: FetchStatus,
    pub analysis_status: AnalysisStatus,
    pub discovery_order: i64,
    pub discovered_at: DateTime<Utc>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Fields supplied when creating a page; it always starts PENDING
#[derive(Debug, Clone)]
pub struct NewPage {
    pub url: String,
    pub discovery_order: i64,
}

/// Partial update of a page
///
/// `None` leaves a field unchanged. The doubly-optional fields can be
/// cleared with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePatch {
    pub status: Option<PageStatus>,
    pub fetch_status: Option<FetchStatus>,
    pub analysis_status: Option<AnalysisStatus>,
    pub analyzed_at: Option<Option<DateTime<Utc>>>,
    pub last_error: Option<Option<String>>,
}

impl PagePatch {
    pub fn status(status: PageStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn fetch_status(mut self, fetch_status: FetchStatus) -> Self {
        self.fetch_status = Some(fetch_status);
        self
    }

    pub fn analysis_status(mut self, analysis_status: AnalysisStatus) -> Self {
        self.analysis_status = Some(analysis_status);
        self
    }

    pub fn analyzed_now(mut self) -> Self {
        self.analyzed_at = Some(Some(Utc::now()));
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    /// Applies the patch to an in-memory page
    pub fn apply(&self, page: &mut Page) {
        if let Some(status) = self.status {
            page.status = status;
        }
        if let Some(fetch_status) = self.fetch_status {
            page.fetch_status = fetch_status;
        }
        if let Some(analysis_status) = self.analysis_status {
            page.analysis_status = analysis_status;
        }
        if let Some(analyzed_at) = self.analyzed_at {
            page.analyzed_at = analyzed_at;
        }
        if let Some(last_error) = &self.last_error {
            page.last_error = last_error.clone();
        }
    }
}

/// A stored analyzer verdict
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnalysisRecord {
    pub page_id: i64,
    pub analysis: PageAnalysis,
    pub analyzed_at: DateTime<Utc>,
}

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAudit {
    pub page_id: i64,
    pub href: String,
    pub anchor_text: String,
    pub is_internal: bool,
    pub nofollow: bool,
}

/// Kind of asset referenced by a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Script,
    Stylesheet,
}

impl AssetKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "script" => Some(Self::Script),
            "stylesheet" => Some(Self::Stylesheet),
            _ => None,
        }
    }
}

/// An asset referenced by a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAudit {
    pub page_id: i64,
    pub src: String,
    pub alt: Option<String>,
    pub kind: AssetKind,
}

/// Response timing and size for a page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceAudit {
    pub page_id: i64,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub content_length: Option<u64>,
    pub html_bytes: usize,
}

/// Page counts per status for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub analyzing: usize,
    pub analyzed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.analyzing + self.analyzed + self.failed
    }

    pub fn get(&self, status: PageStatus) -> usize {
        match status {
            PageStatus::Pending => self.pending,
            PageStatus::Analyzing => self.analyzing,
            PageStatus::Analyzed => self.analyzed,
            PageStatus::Failed => self.failed,
        }
    }

    pub(crate) fn add(&mut self, status: PageStatus, n: usize) {
        match status {
            PageStatus::Pending => self.pending += n,
            PageStatus::Analyzing => self.analyzing += n,
            PageStatus::Analyzed => self.analyzed += n,
            PageStatus::Failed => self.failed += n,
        }
    }
}
