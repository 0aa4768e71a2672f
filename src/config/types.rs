use serde::Deserialize;
use std::time::Duration;

/// User agent sent on every request to the audited host
pub const AUDIT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; SiteAuditBot/1.0; +https://siteaudit.dev/bot)";

/// Product token matched against robots.txt user-agent groups
pub const ROBOTS_AGENT_TOKEN: &str = "SiteAuditBot";

/// Timeout for a single page fetch (milliseconds)
pub const PAGE_FETCH_TIMEOUT_MS: u64 = 15_000;

/// Timeout for robots.txt and sitemap fetches (milliseconds)
pub const ROBOTS_FETCH_TIMEOUT_MS: u64 = 5_000;

/// Minimum spacing between successive requests to the audited host (milliseconds)
pub const CRAWL_DELAY_MS: u64 = 1_000;

/// Ceiling applied to a robots.txt Crawl-delay (milliseconds)
pub const MAX_CRAWL_DELAY_MS: u64 = 30_000;

/// Default cap on the number of pages a run discovers
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Default number of pages analyzed by the first batch and by each scan
pub const DEFAULT_MAX_PAGES_TO_SCAN: usize = 10;

/// Number of pages processed per batch, and the bound on concurrent analyzer calls
pub const AI_ANALYSIS_BATCH_SIZE: usize = 5;

/// Timeout for a single analyzer call (milliseconds)
pub const AI_ANALYSIS_TIMEOUT_MS: u64 = 60_000;

/// Standard sitemap locations, tried in order when no declared sitemap responds
pub const SITEMAP_FALLBACK_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Main configuration structure, as read from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent header sent on every fetch
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Token used to match robots.txt user-agent groups
    #[serde(rename = "robots-agent")]
    pub robots_agent: String,

    /// Page fetch timeout (milliseconds)
    #[serde(rename = "page-fetch-timeout-ms")]
    pub page_fetch_timeout_ms: u64,

    /// robots.txt and sitemap fetch timeout (milliseconds)
    #[serde(rename = "robots-fetch-timeout-ms")]
    pub robots_fetch_timeout_ms: u64,

    /// Minimum time between requests to the audited host (milliseconds)
    #[serde(rename = "crawl-delay-ms")]
    pub crawl_delay_ms: u64,

    /// Honor a larger Crawl-delay declared in robots.txt
    #[serde(rename = "respect-robots-crawl-delay")]
    pub respect_robots_crawl_delay: bool,

    /// Largest robots.txt Crawl-delay honored (milliseconds); larger values are clamped
    #[serde(rename = "max-crawl-delay-ms")]
    pub max_crawl_delay_ms: u64,

    /// Sitemap locations tried in order when no declared sitemap responds
    #[serde(rename = "sitemap-fallback-paths")]
    pub sitemap_fallback_paths: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: AUDIT_USER_AGENT.to_string(),
            robots_agent: ROBOTS_AGENT_TOKEN.to_string(),
            page_fetch_timeout_ms: PAGE_FETCH_TIMEOUT_MS,
            robots_fetch_timeout_ms: ROBOTS_FETCH_TIMEOUT_MS,
            crawl_delay_ms: CRAWL_DELAY_MS,
            respect_robots_crawl_delay: true,
            max_crawl_delay_ms: MAX_CRAWL_DELAY_MS,
            sitemap_fallback_paths: SITEMAP_FALLBACK_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Page cap and batching configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Default cap on pages discovered per run
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Default number of pages analyzed by the first batch and by scan-more
    #[serde(rename = "max-pages-to-scan")]
    pub max_pages_to_scan: usize,

    /// Pages per batch; also bounds concurrent analyzer calls
    #[serde(rename = "ai-analysis-batch-size")]
    pub ai_analysis_batch_size: usize,

    /// Analyzer call timeout (milliseconds)
    #[serde(rename = "ai-analysis-timeout-ms")]
    pub ai_analysis_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_pages_to_scan: DEFAULT_MAX_PAGES_TO_SCAN,
            ai_analysis_batch_size: AI_ANALYSIS_BATCH_SIZE,
            ai_analysis_timeout_ms: AI_ANALYSIS_TIMEOUT_MS,
        }
    }
}

/// Which analyzer judges fetched pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerKind {
    /// Deterministic local heuristics
    Rules,
    /// Remote AI scoring service
    Http,
}

/// Analyzer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub kind: AnalyzerKind,

    /// Endpoint of the AI scoring service (required for `kind = "http"`)
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the service API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// Model identifier forwarded to the service
    pub model: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            kind: AnalyzerKind::Rules,
            endpoint: None,
            api_key_env: None,
            model: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./site-audit.db".to_string(),
        }
    }
}

/// Runtime settings threaded through the audit coordinators
///
/// This is the resolved form of the crawler and limits sections. Tests build
/// it directly to shrink delays and timeouts.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub user_agent: String,
    pub robots_agent: String,
    pub page_fetch_timeout: Duration,
    pub robots_fetch_timeout: Duration,
    pub crawl_delay: Duration,
    pub respect_robots_crawl_delay: bool,
    pub max_crawl_delay: Duration,
    pub sitemap_fallback_paths: Vec<String>,
    pub default_max_pages: usize,
    pub default_max_pages_to_scan: usize,
    pub batch_size: usize,
    pub analysis_timeout: Duration,
}

impl AuditConfig {
    /// Builds runtime settings from a loaded configuration file
    pub fn from_config(config: &Config) -> Self {
        let crawler = &config.crawler;
        let limits = &config.limits;
        Self {
            user_agent: crawler.user_agent.clone(),
            robots_agent: crawler.robots_agent.clone(),
            page_fetch_timeout: Duration::from_millis(crawler.page_fetch_timeout_ms),
            robots_fetch_timeout: Duration::from_millis(crawler.robots_fetch_timeout_ms),
            crawl_delay: Duration::from_millis(crawler.crawl_delay_ms),
            respect_robots_crawl_delay: crawler.respect_robots_crawl_delay,
            max_crawl_delay: Duration::from_millis(crawler.max_crawl_delay_ms),
            sitemap_fallback_paths: crawler.sitemap_fallback_paths.clone(),
            default_max_pages: limits.max_pages,
            default_max_pages_to_scan: limits.max_pages_to_scan,
            batch_size: limits.ai_analysis_batch_size.max(1),
            analysis_timeout: Duration::from_millis(limits.ai_analysis_timeout_ms),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
