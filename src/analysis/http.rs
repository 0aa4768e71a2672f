//! Remote AI scoring service client
//!
//! The service receives the analysis input as JSON and answers with a score
//! and an issue list. Replies are loosely shaped, so they are validated into
//! a strict `PageAnalysis` here and rejected as malformed otherwise.

use crate::analysis::analyzer::{AnalyzerError, PageAnalyzer};
use crate::analysis::types::{AnalysisInput, IssueType, PageAnalysis, PageIssue, Severity};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub struct HttpAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpAnalyzer {
    pub fn new(client: Client, endpoint: &str, api_key: Option<String>, model: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl PageAnalyzer for HttpAnalyzer {
    async fn analyze(&self, input: &AnalysisInput) -> Result<PageAnalysis, AnalyzerError> {
        let body = json!({
            "model": self.model,
            "page": input,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AnalyzerError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| AnalyzerError::Request(format!("Failed to read response: {}", e)))?;

        let (score, issues) = parse_reply(&text)?;
        Ok(PageAnalysis {
            score,
            issues,
            metadata_snapshot: input.page.metadata.clone(),
            analyzer: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Removes a surrounding Markdown code fence (```json ... ```), if present
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Validates a service reply into a score and issue list
///
/// # Accepted Shape
///
/// ```text
/// {"score": 0..=100, "issues": [{"type": "...", "severity": "CRITICAL|WARNING|INFO", "message": "..."}]}
/// ```
///
/// A missing `issues` array means no issues. Unknown issue types map to
/// `OTHER`. A top-level `error` field is a rejection.
pub fn parse_reply(text: &str) -> Result<(u8, Vec<PageIssue>), AnalyzerError> {
    let data: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AnalyzerError::MalformedResponse(format!("Invalid JSON: {}", e)))?;

    if let Some(error) = data.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .or_else(|| error["message"].as_str())
            .unwrap_or("Unknown");
        return Err(AnalyzerError::Rejected(message.to_string()));
    }

    let score = data
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| AnalyzerError::MalformedResponse("score is missing or not a number".into()))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(AnalyzerError::MalformedResponse(format!(
            "score {} is outside 0..=100",
            score
        )));
    }

    let issues = match data.get("issues") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_issue(i, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(AnalyzerError::MalformedResponse(
                "issues is not an array".into(),
            ))
        }
    };

    Ok((score.round() as u8, issues))
}

fn parse_issue(index: usize, item: &Value) -> Result<PageIssue, AnalyzerError> {
    let malformed = |what: &str| AnalyzerError::MalformedResponse(format!("issue {}: {}", index, what));

    if !item.is_object() {
        return Err(malformed("not an object"));
    }

    let issue_type = item["type"]
        .as_str()
        .map(IssueType::from_external)
        .ok_or_else(|| malformed("type is missing"))?;

    let severity = match item.get("severity") {
        None | Some(Value::Null) => issue_type.default_severity(),
        Some(Value::String(s)) => Severity::from_db_string(s)
            .ok_or_else(|| malformed(&format!("unknown severity '{}'", s)))?,
        Some(_) => return Err(malformed("severity is not a string")),
    };

    let message = item["message"]
        .as_str()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| malformed("message is missing"))?;

    Ok(PageIssue {
        issue_type,
        severity,
        message: message.to_string(),
    })
}
