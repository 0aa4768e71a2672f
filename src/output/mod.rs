//! Output module for audit reports
//!
//! This module handles:
//! - Aggregating a run's pages, verdicts and audit rows into a report
//! - Rendering reports as markdown
//! - Printing run status for the CLI

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{print_run_status, FailedPage, RunReport, ScoredPage};

use crate::analysis::IssueType;
use crate::state::PageStatus;
use crate::storage::{AssetKind, AuditStore, StoreError};
use crate::AuditError;
use std::collections::{HashMap, HashSet};

/// Number of lowest-scoring pages kept in a report
const WORST_PAGES: usize = 10;

/// Builds a report for one run from storage
///
/// # Arguments
///
/// * `store` - The storage backend containing the run
/// * `run_id` - The run to aggregate
///
/// # Returns
///
/// * `Ok(RunReport)` - Successfully aggregated report
/// * `Err(AuditError)` - The run does not exist or a query failed
pub fn build_run_report(store: &dyn AuditStore, run_id: i64) -> Result<RunReport, AuditError> {
    let run = store.get_run(run_id).map_err(|e| match e {
        StoreError::RunNotFound(id) => AuditError::RunNotFound(id),
        other => other.into(),
    })?;

    let duration_seconds = run
        .finished_at
        .map(|finished| (finished - run.started_at).num_seconds().max(0) as u64);

    let counts = store.count_pages_by_status(run_id)?;
    let pages = store.list_pages(run_id, None, None)?;
    let analyses = store.list_analyses(run_id)?;

    // Verdicts
    let urls: HashMap<i64, &str> = pages.iter().map(|p| (p.id, p.url.as_str())).collect();
    let mut report = RunReport {
        run_id: run.id,
        project_id: run.project_id.clone(),
        root_url: run.root_url.clone(),
        phase: run.phase.to_string(),
        config_hash: run.config_hash.clone(),
        started_at: run.started_at.to_rfc3339(),
        finished_at: run.finished_at.map(|t| t.to_rfc3339()),
        duration_seconds,
        last_error: run.last_error.clone(),
        counts,
        ..Default::default()
    };

    let mut pages_per_type: HashMap<IssueType, usize> = HashMap::new();
    let mut score_total: u64 = 0;
    for record in &analyses {
        let analysis = &record.analysis;
        score_total += analysis.score as u64;

        for issue in &analysis.issues {
            *report.issues_by_severity.entry(issue.severity).or_insert(0) += 1;
        }
        // Count each issue type once per page
        let types: HashSet<IssueType> = analysis.issues.iter().map(|i| i.issue_type).collect();
        for issue_type in types {
            *pages_per_type.entry(issue_type).or_insert(0) += 1;
        }

        report.worst_pages.push(ScoredPage {
            url: urls.get(&record.page_id).copied().unwrap_or_default().to_string(),
            score: analysis.score,
            issue_count: analysis.issues.len(),
        });
    }

    if !analyses.is_empty() {
        report.average_score = Some(score_total as f64 / analyses.len() as f64);
    }

    let mut issues_by_type: Vec<(IssueType, usize)> = pages_per_type.into_iter().collect();
    issues_by_type.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    report.issues_by_type = issues_by_type;

    report.worst_pages.sort_by(|a, b| a.score.cmp(&b.score).then(b.issue_count.cmp(&a.issue_count)));
    report.worst_pages.truncate(WORST_PAGES);

    // Failed pages and per-page audit rows
    let mut response_total: u64 = 0;
    let mut responses: u64 = 0;
    for page in &pages {
        if page.status == PageStatus::Failed {
            report.failed_pages.push(FailedPage {
                url: page.url.clone(),
                fetch_status: page.fetch_status,
                analysis_status: page.analysis_status,
                error: page.last_error.clone(),
            });
        }

        let links = store.list_link_audits(page.id)?;
        report.total_links += links.len();
        report.internal_links += links.iter().filter(|l| l.is_internal).count();

        report.images_missing_alt += store
            .list_asset_audits(page.id)?
            .iter()
            .filter(|a| a.kind == AssetKind::Image)
            .filter(|a| a.alt.as_deref().map_or(true, |alt| alt.trim().is_empty()))
            .count();

        if let Some(perf) = store.get_performance_audit(page.id)? {
            response_total += perf.response_time_ms;
            responses += 1;
        }
    }
    if responses > 0 {
        report.average_response_time_ms = Some(response_total / responses);
    }

    Ok(report)
}
