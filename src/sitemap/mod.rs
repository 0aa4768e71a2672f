//! Sitemap resolution module
//!
//! Expands explicit, declared and fallback sitemap locations into a flat,
//! deduplicated list of page URLs, capped at a maximum count.
//!
//! # Resolution Rules
//!
//! 1. Explicit and robots-declared sitemaps are all fetched, in order
//! 2. Only if none of them responds, the fallback paths are tried in order
//!    until one responds
//! 3. A sitemap index is expanded one level; an index found inside an index
//!    is ignored
//! 4. Entries are normalized, deduplicated and filtered before the cap counts
//!    them; the first `max_pages` accepted entries win
//!
//! A candidate "responds" when it returns 2xx with at least one sitemap entry,
//! so an HTML soft-404 at `/sitemap.xml` does not end the fallback search.

mod parser;

pub use parser::{parse_sitemap, ParsedSitemap};

use crate::crawler::PageFetcher;
use crate::url::{normalize_url, origin_path};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Outcome of sitemap resolution
#[derive(Debug, Clone, Default)]
pub struct SitemapDiscovery {
    /// Accepted page URLs, normalized, in first-seen order
    pub urls: Vec<Url>,

    /// Sitemap documents that responded, in fetch order
    pub sitemaps_fetched: Vec<String>,

    /// Whether accepted entries were dropped because the cap was reached
    pub truncated: bool,
}

/// Collects normalized, deduplicated URLs up to a cap
struct UrlCollector<'a, F> {
    seen: HashSet<String>,
    urls: Vec<Url>,
    cap: usize,
    truncated: bool,
    accept: &'a F,
}

impl<'a, F: Fn(&Url) -> bool> UrlCollector<'a, F> {
    fn new(cap: usize, accept: &'a F) -> Self {
        Self {
            seen: HashSet::new(),
            urls: Vec::new(),
            cap,
            truncated: false,
            accept,
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }

    fn offer(&mut self, raw: &str) {
        let url = match normalize_url(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping sitemap entry {}: {}", raw, e);
                return;
            }
        };

        if !self.seen.insert(url.to_string()) {
            return;
        }
        if !(self.accept)(&url) {
            tracing::debug!("Skipping sitemap entry {}: filtered", url);
            return;
        }
        if self.is_full() {
            self.truncated = true;
            return;
        }
        self.urls.push(url);
    }
}

/// Fetches and expands sitemaps for the audited root
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    fetcher: PageFetcher,
    timeout: Duration,
    fallback_paths: Vec<String>,
}

impl SitemapResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The throttled fetcher for the audited host
    /// * `timeout` - Timeout for each sitemap fetch
    /// * `fallback_paths` - Paths tried in order when no candidate responds
    pub fn new(fetcher: PageFetcher, timeout: Duration, fallback_paths: Vec<String>) -> Self {
        Self {
            fetcher,
            timeout,
            fallback_paths,
        }
    }

    /// Resolves sitemaps into page URLs
    ///
    /// # Arguments
    ///
    /// * `root` - The audited root URL (fallback paths are resolved against it)
    /// * `candidates` - Explicit and declared sitemap URLs, in priority order
    /// * `max_pages` - Cap on accepted URLs
    /// * `accept` - Filter applied before an entry counts toward the cap
    pub async fn resolve<F>(
        &self,
        root: &Url,
        candidates: &[String],
        max_pages: usize,
        accept: F,
    ) -> SitemapDiscovery
    where
        F: Fn(&Url) -> bool,
    {
        let mut collector = UrlCollector::new(max_pages, &accept);
        let mut visited: HashSet<String> = HashSet::new();
        let mut fetched: Vec<String> = Vec::new();

        for candidate in candidates {
            if collector.is_full() {
                break;
            }
            let Ok(url) = Url::parse(candidate.trim()) else {
                tracing::warn!("Ignoring invalid sitemap URL '{}'", candidate);
                continue;
            };
            if !visited.insert(url.to_string()) {
                continue;
            }
            if let Some(doc) = self.fetch_sitemap(&url).await {
                fetched.push(url.to_string());
                self.absorb(doc, &mut collector, &mut visited, &mut fetched)
                    .await;
            }
        }

        if fetched.is_empty() {
            for path in &self.fallback_paths {
                let Some(url) = origin_path(root, path) else {
                    continue;
                };
                if !visited.insert(url.to_string()) {
                    continue;
                }
                if let Some(doc) = self.fetch_sitemap(&url).await {
                    tracing::info!("Using fallback sitemap {}", url);
                    fetched.push(url.to_string());
                    self.absorb(doc, &mut collector, &mut visited, &mut fetched)
                        .await;
                    break;
                }
            }
        }

        SitemapDiscovery {
            urls: collector.urls,
            sitemaps_fetched: fetched,
            truncated: collector.truncated,
        }
    }

    /// Adds a top-level document's entries, expanding an index one level
    async fn absorb<F: Fn(&Url) -> bool>(
        &self,
        doc: ParsedSitemap,
        collector: &mut UrlCollector<'_, F>,
        visited: &mut HashSet<String>,
        fetched: &mut Vec<String>,
    ) {
        for raw in &doc.urls {
            collector.offer(raw);
        }

        for child in &doc.children {
            if collector.is_full() {
                collector.truncated = true;
                break;
            }
            let Ok(child_url) = Url::parse(child) else {
                continue;
            };
            if !visited.insert(child_url.to_string()) {
                continue;
            }

            let Some(child_doc) = self.fetch_sitemap(&child_url).await else {
                continue;
            };
            fetched.push(child_url.to_string());

            for raw in &child_doc.urls {
                collector.offer(raw);
            }
            if child_doc.is_index() {
                tracing::debug!(
                    "Ignoring nested sitemap index {} ({} children)",
                    child_url,
                    child_doc.children.len()
                );
            }
        }
    }

    /// Fetches and parses one sitemap; None unless it responded with entries
    async fn fetch_sitemap(&self, url: &Url) -> Option<ParsedSitemap> {
        match self.fetcher.fetch_text(url, self.timeout).await {
            Ok(body) => {
                let doc = parse_sitemap(&body);
                if doc.is_empty() {
                    tracing::warn!("Sitemap {} has no entries", url);
                    None
                } else {
                    tracing::debug!(
                        "Sitemap {}: {} urls, {} child sitemaps",
                        url,
                        doc.urls.len(),
                        doc.children.len()
                    );
                    Some(doc)
                }
            }
            Err(e) => {
                tracing::warn!("Sitemap unavailable at {}: {}", url, e);
                None
            }
        }
    }
}
