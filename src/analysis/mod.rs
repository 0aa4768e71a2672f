//! Page analysis module
//!
//! This module defines the verdict types and the `PageAnalyzer` seam, with
//! two implementations: local heuristics and a remote AI scoring service.

mod analyzer;
mod http;
mod rules;
mod types;

pub use analyzer::{AnalyzerError, PageAnalyzer};
pub use http::{parse_reply, HttpAnalyzer};
pub use rules::{score_issues, RuleBasedAnalyzer};
pub use types::{AnalysisInput, IssueType, PageAnalysis, PageIssue, Severity};

use crate::config::{AnalyzerConfig, AnalyzerKind};
use crate::AuditError;
use std::sync::Arc;

/// Builds the analyzer selected by configuration
///
/// # Arguments
///
/// * `config` - The analyzer section of the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn PageAnalyzer>)` - Ready-to-use analyzer
/// * `Err(AuditError::Analyzer)` - Missing endpoint or API key variable
pub fn build_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn PageAnalyzer>, AuditError> {
    match config.kind {
        AnalyzerKind::Rules => Ok(Arc::new(RuleBasedAnalyzer::new())),
        AnalyzerKind::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| AuditError::Analyzer("http analyzer requires an endpoint".into()))?;

            let api_key = match &config.api_key_env {
                Some(var) => Some(std::env::var(var).map_err(|_| {
                    AuditError::Analyzer(format!("environment variable {} is not set", var))
                })?),
                None => None,
            };

            let client = reqwest::Client::builder().build()?;
            tracing::info!("Using AI analyzer at {}", endpoint);
            Ok(Arc::new(HttpAnalyzer::new(
                client,
                endpoint,
                api_key,
                config.model.clone(),
            )))
        }
    }
}
