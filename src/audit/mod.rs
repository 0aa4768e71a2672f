//! Audit module - discovery and analysis coordination
//!
//! # Components
//!
//! - `DiscoveryCoordinator`: robots.txt + sitemaps → PENDING pages
//! - `AnalysisCoordinator`: claimed pages → fetch, extract, analyze, persist
//! - `AuditOrchestrator`: the public entry points (`run_audit`,
//!   `scan_more_pages`, `analyze_stored_page` and the reset operations)

mod analysis;
mod discovery;
mod orchestrator;
mod result;

pub use analysis::AnalysisCoordinator;
pub use discovery::DiscoveryCoordinator;
pub use orchestrator::AuditOrchestrator;
pub use result::{
    AuditRequest, AuditResult, BatchSummary, PageProcessingResult, RunStatus,
    ScanMorePagesResult,
};
