//! Robots.txt handling module
//!
//! This module fetches and parses a site's robots.txt. A missing or
//! unreachable robots.txt is never fatal: it degrades to rules that allow
//! everything and declare no sitemaps.

mod parser;

pub use parser::RobotsRules;

use crate::crawler::PageFetcher;
use crate::url::origin_path;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for the audited root
#[derive(Debug, Clone)]
pub struct RobotsResolver {
    fetcher: PageFetcher,
    agent: String,
    timeout: Duration,
}

impl RobotsResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The throttled fetcher for the audited host
    /// * `agent` - The robots product token
    /// * `timeout` - The short robots.txt fetch timeout
    pub fn new(fetcher: PageFetcher, agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            agent: agent.into(),
            timeout,
        }
    }

    /// Fetches and parses `{root}/robots.txt`
    ///
    /// Non-2xx responses and network failures yield `RobotsRules::unavailable`.
    pub async fn resolve(&self, root: &Url) -> RobotsRules {
        let Some(robots_url) = origin_path(root, "/robots.txt") else {
            return RobotsRules::unavailable(&self.agent);
        };

        match self.fetcher.fetch_text(&robots_url, self.timeout).await {
            Ok(content) => {
                let rules = RobotsRules::parse(&content, &self.agent);
                tracing::debug!(
                    "robots.txt for {}: {} disallow rules, {} sitemaps",
                    root,
                    rules.disallow_prefixes().len(),
                    rules.sitemaps().len()
                );
                rules
            }
            Err(e) => {
                tracing::warn!("robots.txt unavailable at {}: {}", robots_url, e);
                RobotsRules::unavailable(&self.agent)
            }
        }
    }
}
