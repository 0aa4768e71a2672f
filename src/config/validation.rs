use crate::config::types::{
    AnalyzerConfig, AnalyzerKind, Config, CrawlerConfig, LimitsConfig, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_limits_config(&config.limits)?;
    validate_analyzer_config(&config.analyzer)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.robots_agent.is_empty()
        || !config
            .robots_agent
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "robots_agent must be a non-empty product token, got '{}'",
            config.robots_agent
        )));
    }

    if config.page_fetch_timeout_ms == 0 || config.robots_fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch timeouts must be greater than zero".to_string(),
        ));
    }

    // The audited site is third-party infrastructure
    if config.crawl_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "crawl_delay_ms must be >= 100ms, got {}ms",
            config.crawl_delay_ms
        )));
    }

    if config.max_crawl_delay_ms < config.crawl_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_crawl_delay_ms ({}ms) must not be below crawl_delay_ms ({}ms)",
            config.max_crawl_delay_ms, config.crawl_delay_ms
        )));
    }

    for path in &config.sitemap_fallback_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "sitemap fallback path '{}' must start with '/'",
                path
            )));
        }
    }

    Ok(())
}

/// Validates page caps and batching
fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.max_pages_to_scan < 1 {
        return Err(ConfigError::Validation(
            "max_pages_to_scan must be >= 1".to_string(),
        ));
    }

    if config.ai_analysis_batch_size < 1 || config.ai_analysis_batch_size > 50 {
        return Err(ConfigError::Validation(format!(
            "ai_analysis_batch_size must be between 1 and 50, got {}",
            config.ai_analysis_batch_size
        )));
    }

    if config.ai_analysis_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "ai_analysis_timeout_ms must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates analyzer configuration
fn validate_analyzer_config(config: &AnalyzerConfig) -> Result<(), ConfigError> {
    if config.kind != AnalyzerKind::Http {
        return Ok(());
    }

    let endpoint = config.endpoint.as_deref().ok_or_else(|| {
        ConfigError::Validation("analyzer endpoint is required for kind = \"http\"".to_string())
    })?;

    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid analyzer endpoint: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "analyzer endpoint must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if let Some(var) = &config.api_key_env {
        if var.is_empty() {
            return Err(ConfigError::Validation(
                "api_key_env cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
