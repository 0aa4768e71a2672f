//! Run statistics and status display
//!
//! This module holds the aggregated view of one audit run and prints the
//! status table used by the CLI.

use crate::analysis::{IssueType, Severity};
use crate::audit::RunStatus;
use crate::state::{AnalysisStatus, FetchStatus, PageStatus};
use crate::storage::StatusCounts;
use std::collections::BTreeMap;

/// Aggregated results of one audit run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    // Run metadata
    pub run_id: i64,
    pub project_id: String,
    pub root_url: String,
    pub phase: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub last_error: Option<String>,

    // Page counts
    pub counts: StatusCounts,

    // Verdicts
    pub average_score: Option<f64>,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    /// Issue counts per type, most frequent first
    pub issues_by_type: Vec<(IssueType, usize)>,
    /// Lowest-scoring pages, worst first
    pub worst_pages: Vec<ScoredPage>,
    pub failed_pages: Vec<FailedPage>,

    // Link, asset and performance rows
    pub total_links: usize,
    pub internal_links: usize,
    pub images_missing_alt: usize,
    pub average_response_time_ms: Option<u64>,
}

/// An analyzed page and its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPage {
    pub url: String,
    pub score: u8,
    pub issue_count: usize,
}

/// A failed page and why it failed
#[derive(Debug, Clone, PartialEq)]
pub struct FailedPage {
    pub url: String,
    pub fetch_status: FetchStatus,
    pub analysis_status: AnalysisStatus,
    pub error: Option<String>,
}

impl RunReport {
    /// Percentage of discovered pages that reached ANALYZED
    pub fn analyzed_rate(&self) -> f64 {
        percentage(self.counts.analyzed, self.counts.total())
    }

    pub fn total_issues(&self) -> usize {
        self.issues_by_severity.values().sum()
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Prints a run's status to stdout
///
/// # Arguments
///
/// * `status` - The run and its page counts
pub fn print_run_status(status: &RunStatus) {
    let run = &status.run;
    let counts = &status.counts;

    println!("=== Audit Run {} ===\n", run.id);
    println!("  Project: {}", run.project_id);
    println!("  Root URL: {}", run.root_url);
    println!("  Phase: {}", run.phase);
    println!("  Started: {}", run.started_at.to_rfc3339());
    if let Some(finished) = run.finished_at {
        println!("  Last batch finished: {}", finished.to_rfc3339());
    }
    if let Some(error) = &run.last_error {
        println!("  Error: {}", error);
    }
    println!();

    println!("Pages by Status:");
    for page_status in PageStatus::all() {
        let count = counts.get(page_status);
        println!(
            "  {}: {} ({:.1}%)",
            page_status,
            count,
            percentage(count, counts.total())
        );
    }
    println!("  Total: {}", counts.total());
}
