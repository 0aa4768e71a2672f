//! Configuration module for Site-Audit
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and holds the protocol constants used when a setting is not configured.
//!
//! # Example
//!
//! ```no_run
//! use site_audit::config::{load_config, AuditConfig};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-audit.toml")).unwrap();
//! let settings = AuditConfig::from_config(&config);
//! println!("Crawl delay: {:?}", settings.crawl_delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AnalyzerConfig, AnalyzerKind, AuditConfig, Config, CrawlerConfig, LimitsConfig,
    StorageConfig,
};

// Re-export protocol constants
pub use types::{
    AI_ANALYSIS_BATCH_SIZE, AI_ANALYSIS_TIMEOUT_MS, AUDIT_USER_AGENT, CRAWL_DELAY_MS,
    DEFAULT_MAX_PAGES, DEFAULT_MAX_PAGES_TO_SCAN, MAX_CRAWL_DELAY_MS, PAGE_FETCH_TIMEOUT_MS, ROBOTS_AGENT_TOKEN,
    ROBOTS_FETCH_TIMEOUT_MS, SITEMAP_FALLBACK_PATHS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
