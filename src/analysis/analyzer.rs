use crate::analysis::types::{AnalysisInput, PageAnalysis};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from an analyzer call
///
/// Page-scoped: the page is marked failed with this error and the batch
/// continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("Analyzer timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Analyzer request failed: {0}")]
    Request(String),

    #[error("Analyzer returned HTTP {0}")]
    Status(u16),

    #[error("Malformed analyzer response: {0}")]
    MalformedResponse(String),

    #[error("Analyzer rejected the page: {0}")]
    Rejected(String),
}

/// Judges one fetched page
#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    /// Scores the page and lists its issues
    async fn analyze(&self, input: &AnalysisInput) -> Result<PageAnalysis, AnalyzerError>;

    /// Short name recorded on every analysis this analyzer produces
    fn name(&self) -> &str;
}
