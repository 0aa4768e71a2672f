//! Analysis verdict types
//!
//! `PageAnalysis` is the strict internal form every analyzer must produce.
//! Loosely-typed service replies are validated into it at the boundary.

use crate::crawler::{ExtractedPage, PageMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }

    /// Parses a severity, ignoring case and surrounding whitespace
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "WARNING" => Some(Self::Warning),
            "INFO" => Some(Self::Info),
            _ => None,
        }
    }

    /// Points subtracted from a page score per issue of this severity
    pub fn score_penalty(&self) -> u32 {
        match self {
            Self::Critical => 15,
            Self::Warning => 5,
            Self::Info => 1,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Critical, Self::Warning, Self::Info]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Kinds of SEO/AEO problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    MissingTitle,
    TitleTooShort,
    TitleTooLong,
    MissingMetaDescription,
    MetaDescriptionTooShort,
    MetaDescriptionTooLong,
    MissingH1,
    MultipleH1,
    MissingCanonical,
    Noindex,
    MissingLang,
    MissingOpenGraph,
    ImageMissingAlt,
    BrokenLink,
    NoStructuredData,
    InvalidStructuredData,
    SlowResponse,
    LargePage,
    ThinContent,
    NoQuestionHeadings,
    MissingFaqSchema,
    Other,
}

impl IssueType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::MissingTitle => "MISSING_TITLE",
            Self::TitleTooShort => "TITLE_TOO_SHORT",
            Self::TitleTooLong => "TITLE_TOO_LONG",
            Self::MissingMetaDescription => "MISSING_META_DESCRIPTION",
            Self::MetaDescriptionTooShort => "META_DESCRIPTION_TOO_SHORT",
            Self::MetaDescriptionTooLong => "META_DESCRIPTION_TOO_LONG",
            Self::MissingH1 => "MISSING_H1",
            Self::MultipleH1 => "MULTIPLE_H1",
            Self::MissingCanonical => "MISSING_CANONICAL",
            Self::Noindex => "NOINDEX",
            Self::MissingLang => "MISSING_LANG",
            Self::MissingOpenGraph => "MISSING_OPEN_GRAPH",
            Self::ImageMissingAlt => "IMAGE_MISSING_ALT",
            Self::BrokenLink => "BROKEN_LINK",
            Self::NoStructuredData => "NO_STRUCTURED_DATA",
            Self::InvalidStructuredData => "INVALID_STRUCTURED_DATA",
            Self::SlowResponse => "SLOW_RESPONSE",
            Self::LargePage => "LARGE_PAGE",
            Self::ThinContent => "THIN_CONTENT",
            Self::NoQuestionHeadings => "NO_QUESTION_HEADINGS",
            Self::MissingFaqSchema => "MISSING_FAQ_SCHEMA",
            Self::Other => "OTHER",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|t| t.to_db_string().eq_ignore_ascii_case(s.trim()))
    }

    /// Maps a type name from an external source, falling back to `Other`
    pub fn from_external(s: &str) -> Self {
        let normalized = s.trim().replace(['-', ' '], "_");
        Self::from_db_string(&normalized).unwrap_or(Self::Other)
    }

    /// Severity used when the producer doesn't choose one
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::MissingTitle | Self::Noindex | Self::InvalidStructuredData => Severity::Critical,
            Self::TitleTooShort
            | Self::TitleTooLong
            | Self::MissingMetaDescription
            | Self::MissingH1
            | Self::ImageMissingAlt
            | Self::BrokenLink
            | Self::NoStructuredData
            | Self::SlowResponse
            | Self::LargePage
            | Self::ThinContent => Severity::Warning,
            Self::MetaDescriptionTooShort
            | Self::MetaDescriptionTooLong
            | Self::MultipleH1
            | Self::MissingCanonical
            | Self::MissingLang
            | Self::MissingOpenGraph
            | Self::NoQuestionHeadings
            | Self::MissingFaqSchema
            | Self::Other => Severity::Info,
        }
    }

    pub fn all() -> [Self; 22] {
        [
            Self::MissingTitle,
            Self::TitleTooShort,
            Self::TitleTooLong,
            Self::MissingMetaDescription,
            Self::MetaDescriptionTooShort,
            Self::MetaDescriptionTooLong,
            Self::MissingH1,
            Self::MultipleH1,
            Self::MissingCanonical,
            Self::Noindex,
            Self::MissingLang,
            Self::MissingOpenGraph,
            Self::ImageMissingAlt,
            Self::BrokenLink,
            Self::NoStructuredData,
            Self::InvalidStructuredData,
            Self::SlowResponse,
            Self::LargePage,
            Self::ThinContent,
            Self::NoQuestionHeadings,
            Self::MissingFaqSchema,
            Self::Other,
        ]
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A single detected problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
}

impl PageIssue {
    /// Creates an issue with the type's default severity
    pub fn new(issue_type: IssueType, message: impl Into<String>) -> Self {
        Self {
            issue_type,
            severity: issue_type.default_severity(),
            message: message.into(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// An analyzer's verdict for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// 0..=100
    pub score: u8,
    pub issues: Vec<PageIssue>,
    pub metadata_snapshot: PageMetadata,
    /// Name of the analyzer that produced the verdict
    pub analyzer: String,
}

impl PageAnalysis {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Everything an analyzer gets to see about one fetched page
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisInput {
    pub url: String,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub content_length: Option<u64>,
    pub html_bytes: usize,
    pub page: ExtractedPage,
}
