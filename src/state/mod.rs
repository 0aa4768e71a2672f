//! State module for tracking audit progress
//!
//! # Components
//!
//! - `PageStatus`: the page state machine (PENDING → ANALYZING → ANALYZED | FAILED)
//! - `FetchStatus` / `AnalysisStatus`: independent fetch and analyzer outcomes for a page
//! - `RunPhase`: the phase of an audit run (DISCOVERING, ANALYZING, IDLE)

mod page_status;
mod run_phase;

// Re-export main types
pub use page_status::{AnalysisStatus, FetchStatus, PageStatus};
pub use run_phase::RunPhase;
