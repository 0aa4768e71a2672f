//! Site-Audit: an incremental SEO/AEO website audit engine
//!
//! This crate discovers a site's pages from robots.txt and sitemaps, persists
//! them immediately as pending work, and then analyzes them in rate-limited
//! batches that can be resumed long after the run started.

pub mod analysis;
pub mod audit;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Audit operations
///
/// Only run-scoped failures surface here. Failures scoped to a single page
/// are recorded on that page and never propagate.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Discovery failed for {root_url}: {reason}")]
    DiscoveryFailed { root_url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Audit run not found: {0}")]
    RunNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Page {0} is already being analyzed")]
    PageBusy(i64),

    #[error("Analyzer setup error: {0}")]
    Analyzer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Site-Audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use audit::{AuditOrchestrator, AuditRequest, AuditResult, ScanMorePagesResult};
pub use config::{AuditConfig, Config};
pub use state::{PageStatus, RunPhase};
pub use crate::url::{normalize_url, same_site};
