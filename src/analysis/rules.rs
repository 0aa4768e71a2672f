//! Deterministic heuristic analyzer
//!
//! Works only from extracted data and the fetch timings, so it never makes
//! a network call.

use crate::analysis::analyzer::{AnalyzerError, PageAnalyzer};
use crate::analysis::types::{AnalysisInput, IssueType, PageAnalysis, PageIssue, Severity};
use async_trait::async_trait;

const TITLE_MIN_CHARS: usize = 10;
const TITLE_MAX_CHARS: usize = 60;
const DESCRIPTION_MIN_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 160;
const SLOW_RESPONSE_MS: u64 = 3_000;
const VERY_SLOW_RESPONSE_MS: u64 = 10_000;
const LARGE_PAGE_BYTES: usize = 2 * 1024 * 1024;
const THIN_CONTENT_WORDS: usize = 300;

/// Words that open a question heading
const QUESTION_WORDS: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "which", "can", "does", "do", "is", "are",
    "should",
];

/// Computes a score from issue severities
///
/// 100 − 15·critical − 5·warning − 1·info, clamped to 0..=100.
pub fn score_issues(issues: &[PageIssue]) -> u8 {
    let penalty: u32 = issues.iter().map(|i| i.severity.score_penalty()).sum();
    100u32.saturating_sub(penalty) as u8
}

#[derive(Debug, Clone, Default)]
pub struct RuleBasedAnalyzer;

impl RuleBasedAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Runs every rule against the input
    pub fn collect_issues(&self, input: &AnalysisInput) -> Vec<PageIssue> {
        let mut issues = Vec::new();
        check_title(input, &mut issues);
        check_description(input, &mut issues);
        check_headings(input, &mut issues);
        check_indexing(input, &mut issues);
        check_images(input, &mut issues);
        check_structured_data(input, &mut issues);
        check_performance(input, &mut issues);
        check_answer_readiness(input, &mut issues);
        issues
    }
}

#[async_trait]
impl PageAnalyzer for RuleBasedAnalyzer {
    async fn analyze(&self, input: &AnalysisInput) -> Result<PageAnalysis, AnalyzerError> {
        let issues = self.collect_issues(input);
        Ok(PageAnalysis {
            score: score_issues(&issues),
            issues,
            metadata_snapshot: input.page.metadata.clone(),
            analyzer: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "rules"
    }
}

fn check_title(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    match input.page.metadata.title.as_deref() {
        None => issues.push(PageIssue::new(IssueType::MissingTitle, "Page has no <title>")),
        Some(title) => {
            let len = title.chars().count();
            if len < TITLE_MIN_CHARS {
                issues.push(PageIssue::new(
                    IssueType::TitleTooShort,
                    format!("Title is {} characters (minimum {})", len, TITLE_MIN_CHARS),
                ));
            } else if len > TITLE_MAX_CHARS {
                issues.push(PageIssue::new(
                    IssueType::TitleTooLong,
                    format!("Title is {} characters (maximum {})", len, TITLE_MAX_CHARS),
                ));
            }
        }
    }
}

fn check_description(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    match input.page.metadata.meta_description.as_deref() {
        None => issues.push(PageIssue::new(
            IssueType::MissingMetaDescription,
            "Page has no meta description",
        )),
        Some(description) => {
            let len = description.chars().count();
            if len < DESCRIPTION_MIN_CHARS {
                issues.push(PageIssue::new(
                    IssueType::MetaDescriptionTooShort,
                    format!("Meta description is {} characters (minimum {})", len, DESCRIPTION_MIN_CHARS),
                ));
            } else if len > DESCRIPTION_MAX_CHARS {
                issues.push(PageIssue::new(
                    IssueType::MetaDescriptionTooLong,
                    format!("Meta description is {} characters (maximum {})", len, DESCRIPTION_MAX_CHARS),
                ));
            }
        }
    }
}

fn check_headings(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    match input.page.metadata.h1.len() {
        0 => issues.push(PageIssue::new(IssueType::MissingH1, "Page has no <h1>")),
        1 => {}
        n => issues.push(PageIssue::new(
            IssueType::MultipleH1,
            format!("Page has {} <h1> elements", n),
        )),
    }
}

fn check_indexing(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    let meta = &input.page.metadata;

    if meta.is_noindex() {
        issues.push(PageIssue::new(
            IssueType::Noindex,
            "Meta robots prevents indexing",
        ));
    }
    if meta.canonical.is_none() {
        issues.push(PageIssue::new(
            IssueType::MissingCanonical,
            "Page has no canonical link",
        ));
    }
    if meta.lang.is_none() {
        issues.push(PageIssue::new(
            IssueType::MissingLang,
            "<html> has no lang attribute",
        ));
    }
    if meta.og_title.is_none() && meta.og_description.is_none() {
        issues.push(PageIssue::new(
            IssueType::MissingOpenGraph,
            "Page has no Open Graph title or description",
        ));
    }
}

fn check_images(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    let missing = input
        .page
        .images
        .iter()
        .filter(|img| img.alt.is_none())
        .count();
    if missing > 0 {
        issues.push(PageIssue::new(
            IssueType::ImageMissingAlt,
            format!("{} of {} images have no alt attribute", missing, input.page.images.len()),
        ));
    }
}

fn check_structured_data(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    let blocks = &input.page.structured_data;
    if blocks.is_empty() {
        issues.push(PageIssue::new(
            IssueType::NoStructuredData,
            "Page has no JSON-LD structured data",
        ));
        return;
    }

    for block in blocks.iter().filter(|b| !b.valid) {
        issues.push(PageIssue::new(
            IssueType::InvalidStructuredData,
            format!(
                "JSON-LD block does not parse: {}",
                block.error.as_deref().unwrap_or("unknown error")
            ),
        ));
    }
}

fn check_performance(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    if input.response_time_ms >= SLOW_RESPONSE_MS {
        let issue = PageIssue::new(
            IssueType::SlowResponse,
            format!("Response took {}ms", input.response_time_ms),
        );
        issues.push(if input.response_time_ms >= VERY_SLOW_RESPONSE_MS {
            issue.with_severity(Severity::Critical)
        } else {
            issue
        });
    }

    if input.html_bytes > LARGE_PAGE_BYTES {
        issues.push(PageIssue::new(
            IssueType::LargePage,
            format!("HTML is {} bytes", input.html_bytes),
        ));
    }

    if input.page.metadata.word_count < THIN_CONTENT_WORDS {
        issues.push(PageIssue::new(
            IssueType::ThinContent,
            format!(
                "Page has {} words of visible text (minimum {})",
                input.page.metadata.word_count, THIN_CONTENT_WORDS
            ),
        ));
    }
}

/// Checks whether a heading reads as a question
fn is_question(text: &str) -> bool {
    let text = text.trim();
    if text.ends_with('?') {
        return true;
    }
    text.split_whitespace()
        .next()
        .map(|w| QUESTION_WORDS.contains(&w.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// AEO checks: question-style headings, and FAQ markup when they exist
fn check_answer_readiness(input: &AnalysisInput, issues: &mut Vec<PageIssue>) {
    let questions = input
        .page
        .metadata
        .headings
        .iter()
        .filter(|h| h.level >= 2 && is_question(&h.text))
        .count();

    if questions == 0 {
        issues.push(PageIssue::new(
            IssueType::NoQuestionHeadings,
            "No headings phrased as questions",
        ));
        return;
    }

    let has_faq = input
        .page
        .structured_data
        .iter()
        .flat_map(|b| b.types.iter())
        .any(|t| t.eq_ignore_ascii_case("FAQPage") || t.eq_ignore_ascii_case("QAPage"));
    if !has_faq {
        issues.push(PageIssue::new(
            IssueType::MissingFaqSchema,
            format!("{} question headings but no FAQPage markup", questions),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{
        ExtractedImage, ExtractedPage, Heading, PageMetadata, StructuredDataBlock,
    };

    fn good_input() -> AnalysisInput {
        AnalysisInput {
            url: "https://example.com/guide".to_string(),
            status_code: 200,
            response_time_ms: 120,
            content_length: Some(20_000),
            html_bytes: 20_000,
            page: ExtractedPage {
                metadata: PageMetadata {
                    title: Some("A complete guide to widgets".to_string()),
                    meta_description: Some(
                        "Everything you need to know about choosing, fitting and maintaining widgets."
                            .to_string(),
                    ),
                    canonical: Some("https://example.com/guide".to_string()),
                    lang: Some("en".to_string()),
                    meta_robots: None,
                    h1: vec!["Widget guide".to_string()],
                    headings: vec![
                        Heading { level: 1, text: "Widget guide".to_string() },
                        Heading { level: 2, text: "What is a widget?".to_string() },
                    ],
                    og_title: Some("Widget guide".to_string()),
                    og_description: None,
                    og_image: None,
                    word_count: 1_200,
                },
                images: vec![ExtractedImage {
                    src: "https://example.com/w.png".to_string(),
                    alt: Some("A widget".to_string()),
                }],
                structured_data: vec![StructuredDataBlock {
                    types: vec!["FAQPage".to_string()],
                    valid: true,
                    error: None,
                }],
                ..Default::default()
            },
        }
    }

    fn types(issues: &[PageIssue]) -> Vec<IssueType> {
        issues.iter().map(|i| i.issue_type).collect()
    }

    #[test]
    fn test_clean_page_has_no_issues() {
        let issues = RuleBasedAnalyzer::new().collect_issues(&good_input());
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
        assert_eq!(score_issues(&issues), 100);
    }

    #[test]
    fn test_missing_title_and_description() {
        let mut input = good_input();
        input.page.metadata.title = None;
        input.page.metadata.meta_description = Some("short".to_string());
        let found = types(&RuleBasedAnalyzer::new().collect_issues(&input));
        assert!(found.contains(&IssueType::MissingTitle));
        assert!(found.contains(&IssueType::MetaDescriptionTooShort));
    }

    #[test]
    fn test_heading_rules() {
        let mut input = good_input();
        input.page.metadata.h1 = vec!["One".to_string(), "Two".to_string()];
        assert!(types(&RuleBasedAnalyzer::new().collect_issues(&input)).contains(&IssueType::MultipleH1));

        input.page.metadata.h1.clear();
        assert!(types(&RuleBasedAnalyzer::new().collect_issues(&input)).contains(&IssueType::MissingH1));
    }

    #[test]
    fn test_noindex_is_critical() {
        let mut input = good_input();
        input.page.metadata.meta_robots = Some("noindex,nofollow".to_string());
        let issues = RuleBasedAnalyzer::new().collect_issues(&input);
        let noindex = issues
            .iter()
            .find(|i| i.issue_type == IssueType::Noindex)
            .unwrap();
        assert_eq!(noindex.severity, Severity::Critical);
    }

    #[test]
    fn test_image_alt_counted() {
        let mut input = good_input();
        input.page.images.push(ExtractedImage {
            src: "https://example.com/a.png".to_string(),
            alt: None,
        });
        input.page.images.push(ExtractedImage {
            src: "https://example.com/b.png".to_string(),
            alt: Some(String::new()),
        });
        let issues = RuleBasedAnalyzer::new().collect_issues(&input);
        let alt = issues
            .iter()
            .find(|i| i.issue_type == IssueType::ImageMissingAlt)
            .unwrap();
        assert_eq!(alt.message, "1 of 3 images have no alt attribute");
    }

    #[test]
    fn test_structured_data_rules() {
        let mut input = good_input();
        input.page.structured_data[0].valid = false;
        input.page.structured_data[0].error = Some("EOF".to_string());
        assert!(types(&RuleBasedAnalyzer::new().collect_issues(&input))
            .contains(&IssueType::InvalidStructuredData));

        input.page.structured_data.clear();
        let found = types(&RuleBasedAnalyzer::new().collect_issues(&input));
        assert!(found.contains(&IssueType::NoStructuredData));
        assert!(found.contains(&IssueType::MissingFaqSchema));
    }

    #[test]
    fn test_slow_response_severity() {
        let mut input = good_input();
        input.response_time_ms = 4_000;
        let issues = RuleBasedAnalyzer::new().collect_issues(&input);
        assert_eq!(issues[0].issue_type, IssueType::SlowResponse);
        assert_eq!(issues[0].severity, Severity::Warning);

        input.response_time_ms = 12_000;
        let issues = RuleBasedAnalyzer::new().collect_issues(&input);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_question_headings() {
        assert!(is_question("How do widgets work"));
        assert!(is_question("Pricing?"));
        assert!(!is_question("Our pricing"));

        let mut input = good_input();
        input.page.metadata.headings.retain(|h| h.level == 1);
        assert!(types(&RuleBasedAnalyzer::new().collect_issues(&input))
            .contains(&IssueType::NoQuestionHeadings));
    }

    #[test]
    fn test_score_formula() {
        let issues = vec![
            PageIssue::new(IssueType::MissingTitle, "x"),
            PageIssue::new(IssueType::MissingH1, "x"),
            PageIssue::new(IssueType::MissingLang, "x"),
        ];
        assert_eq!(score_issues(&issues), 100 - 15 - 5 - 1);

        let many: Vec<PageIssue> = (0..10)
            .map(|_| PageIssue::new(IssueType::MissingTitle, "x"))
            .collect();
        assert_eq!(score_issues(&many), 0);
    }

    #[tokio::test]
    async fn test_analyze_snapshots_metadata() {
        let input = good_input();
        let analysis = RuleBasedAnalyzer::new().analyze(&input).await.unwrap();
        assert_eq!(analysis.analyzer, "rules");
        assert_eq!(analysis.metadata_snapshot, input.page.metadata);
        assert_eq!(analysis.score, 100);
    }
}
