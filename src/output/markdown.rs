//! Markdown report generation
//!
//! This module renders a run report as a human-readable markdown document:
//! run information, page status breakdown, issue totals, worst pages and
//! failed pages.

use crate::output::stats::RunReport;
use crate::state::PageStatus;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Number of rows shown in the worst-pages and failed-pages tables
const TABLE_LIMIT: usize = 20;

/// Writes a run report as markdown
///
/// # Arguments
///
/// * `report` - The aggregated run
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_report(report: &RunReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_report(report: &RunReport) -> String {
    let mut md = String::new();

    md.push_str("# Site Audit Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", report.run_id));
    md.push_str(&format!("- **Project**: {}\n", report.project_id));
    md.push_str(&format!("- **Root URL**: {}\n", report.root_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Last Batch Finished**: {}\n", finished));
    }
    if let Some(duration) = report.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Phase**: {}\n", report.phase));
    if !report.config_hash.is_empty() {
        md.push_str(&format!("- **Config Hash**: {}\n", report.config_hash));
    }
    if let Some(error) = &report.last_error {
        md.push_str(&format!("- **Error**: {}\n", error));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Discovered**: {}\n", report.counts.total()));
    md.push_str(&format!(
        "- **Analyzed**: {} ({:.2}%)\n",
        report.counts.analyzed,
        report.analyzed_rate()
    ));
    match report.average_score {
        Some(score) => md.push_str(&format!("- **Average Score**: {:.1}\n", score)),
        None => md.push_str("- **Average Score**: n/a\n"),
    }
    md.push_str(&format!("- **Total Issues**: {}\n", report.total_issues()));
    md.push_str(&format!(
        "- **Links**: {} ({} internal)\n",
        report.total_links, report.internal_links
    ));
    md.push_str(&format!(
        "- **Images Missing Alt Text**: {}\n",
        report.images_missing_alt
    ));
    if let Some(ms) = report.average_response_time_ms {
        md.push_str(&format!("- **Average Response Time**: {} ms\n", ms));
    }
    md.push('\n');

    // Status breakdown
    md.push_str("## Page Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for status in PageStatus::all() {
        md.push_str(&format!("| {} | {} |\n", status, report.counts.get(status)));
    }
    md.push('\n');

    // Issues
    if !report.issues_by_severity.is_empty() {
        md.push_str("## Issues by Severity\n\n");
        md.push_str("| Severity | Count |\n");
        md.push_str("|----------|-------|\n");
        for (severity, count) in &report.issues_by_severity {
            md.push_str(&format!("| {} | {} |\n", severity, count));
        }
        md.push('\n');
    }

    if !report.issues_by_type.is_empty() {
        md.push_str("## Issues by Type\n\n");
        md.push_str("| Issue | Severity | Pages |\n");
        md.push_str("|-------|----------|-------|\n");
        for (issue_type, count) in &report.issues_by_type {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                issue_type,
                issue_type.default_severity(),
                count
            ));
        }
        md.push('\n');
    }

    if !report.worst_pages.is_empty() {
        md.push_str("## Lowest Scoring Pages\n\n");
        md.push_str("| URL | Score | Issues |\n");
        md.push_str("|-----|-------|--------|\n");
        for page in report.worst_pages.iter().take(TABLE_LIMIT) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.url, page.score, page.issue_count
            ));
        }
        md.push('\n');
    }

    if !report.failed_pages.is_empty() {
        md.push_str("## Failed Pages\n\n");
        md.push_str("| URL | Fetch | Analysis | Error |\n");
        md.push_str("|-----|-------|----------|-------|\n");
        for page in report.failed_pages.iter().take(TABLE_LIMIT) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                page.url,
                page.fetch_status.to_db_string(),
                page.analysis_status.to_db_string(),
                page.error.as_deref().unwrap_or("").replace('|', "\\|")
            ));
        }
        if report.failed_pages.len() > TABLE_LIMIT {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.failed_pages.len() - TABLE_LIMIT
            ));
        }
        md.push('\n');
    }

    md
}
