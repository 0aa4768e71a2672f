//! Discovery coordinator
//!
//! Enumerates a site's pages from robots.txt and sitemaps and persists every
//! one of them as PENDING before any analysis starts.

use crate::config::AuditConfig;
use crate::crawler::{effective_delay, PageFetcher};
use crate::robots::{RobotsResolver, RobotsRules};
use crate::sitemap::SitemapResolver;
use crate::state::RunPhase;
use crate::storage::{lock_store, AuditRun, NewPage, Page, SharedStore};
use crate::url::{normalize_url, same_site};
use crate::AuditError;
use std::sync::Arc;
use url::Url;

/// Produces the full page set of a run
pub struct DiscoveryCoordinator {
    config: Arc<AuditConfig>,
    fetcher: PageFetcher,
    store: SharedStore,
}

impl DiscoveryCoordinator {
    pub fn new(config: Arc<AuditConfig>, fetcher: PageFetcher, store: SharedStore) -> Self {
        Self {
            config,
            fetcher,
            store,
        }
    }

    /// Discovers and persists the pages of a run
    ///
    /// # Discovery Flow
    ///
    /// 1. Resolve robots.txt (never fatal) and adopt a larger Crawl-delay
    /// 2. Expand the explicit sitemap, then the declared ones, then the fallbacks
    /// 3. Keep same-site URLs robots.txt allows, up to the run's cap
    /// 4. With nothing found, fall back to the root page alone
    /// 5. Create every page PENDING in one store call and move the run to ANALYZING
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Page>)` - The created pages in discovery order
    /// * `Err(AuditError::DiscoveryFailed)` - Nothing to audit; the run is
    ///   marked failed and no page exists
    pub async fn discover(
        &self,
        run: &AuditRun,
        sitemap_url: Option<&str>,
    ) -> Result<Vec<Page>, AuditError> {
        let urls = match self.collect_urls(run, sitemap_url).await {
            Ok(urls) => urls,
            Err(e) => {
                if let AuditError::DiscoveryFailed { reason, .. } = &e {
                    tracing::error!("Discovery failed for run {}: {}", run.id, reason);
                    lock_store(&self.store)?.fail_run(run.id, &e.to_string())?;
                }
                return Err(e);
            }
        };

        let new_pages: Vec<NewPage> = urls
            .iter()
            .enumerate()
            .map(|(order, url)| NewPage {
                url: url.to_string(),
                discovery_order: order as i64,
            })
            .collect();

        let pages = {
            let mut store = lock_store(&self.store)?;
            store.create_pages(run.id, &new_pages)?;
            store.update_run_phase(run.id, RunPhase::Analyzing)?;
            store.list_pages(run.id, None, None)?
        };

        tracing::info!("Run {}: discovered {} pages", run.id, pages.len());
        Ok(pages)
    }

    async fn collect_urls(
        &self,
        run: &AuditRun,
        sitemap_url: Option<&str>,
    ) -> Result<Vec<Url>, AuditError> {
        let root = normalize_url(&run.root_url)?;
        let failed = |reason: String| AuditError::DiscoveryFailed {
            root_url: run.root_url.clone(),
            reason,
        };

        let robots = RobotsResolver::new(
            self.fetcher.clone(),
            self.config.robots_agent.clone(),
            self.config.robots_fetch_timeout,
        )
        .resolve(&root)
        .await;
        self.apply_crawl_delay(&robots);

        let mut candidates: Vec<String> = Vec::new();
        if let Some(explicit) = sitemap_url {
            candidates.push(explicit.to_string());
        }
        candidates.extend(robots.sitemaps().iter().cloned());

        let discovery = SitemapResolver::new(
            self.fetcher.clone(),
            self.config.robots_fetch_timeout,
            self.config.sitemap_fallback_paths.clone(),
        )
        .resolve(&root, &candidates, run.max_pages_discovered, |url| {
            same_site(&root, url) && robots.is_allowed(url)
        })
        .await;

        tracing::debug!("Run {}: sitemaps read {:?}", run.id, discovery.sitemaps_fetched);
        if discovery.truncated {
            tracing::info!(
                "Run {}: sitemap entries truncated at {} pages",
                run.id,
                run.max_pages_discovered
            );
        }
        if !discovery.urls.is_empty() {
            return Ok(discovery.urls);
        }

        // Single-page fallback
        if !robots.is_allowed(&root) {
            return Err(failed("root URL is disallowed by robots.txt".to_string()));
        }
        if !robots.is_fetched() {
            // robots.txt and every sitemap failed: the root must answer
            self.fetcher
                .fetch_page(&root, self.config.page_fetch_timeout)
                .await
                .map_err(|e| failed(format!("no sitemap responded and root is unreachable: {}", e)))?;
        }

        tracing::info!(
            "Run {}: no sitemap entries found, auditing the root page only",
            run.id
        );
        Ok(vec![root])
    }

    fn apply_crawl_delay(&self, robots: &RobotsRules) {
        if !self.config.respect_robots_crawl_delay {
            return;
        }
        let throttle = self.fetcher.throttle();
        let delay = effective_delay(
            throttle.delay(),
            robots.crawl_delay(),
            self.config.max_crawl_delay,
        );
        if delay > throttle.delay() {
            tracing::info!("Honoring robots.txt Crawl-delay of {:?}", delay);
            throttle.raise_delay(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{build_http_client, HostThrottle};
    use crate::state::PageStatus;
    use crate::storage::{shared, MemoryStore, NewRun};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> AuditConfig {
        AuditConfig {
            crawl_delay: Duration::from_millis(1),
            max_crawl_delay: Duration::from_millis(300),
            robots_fetch_timeout: Duration::from_secs(2),
            page_fetch_timeout: Duration::from_secs(2),
            ..AuditConfig::default()
        }
    }

    fn setup(root: &str, max_pages: usize) -> (DiscoveryCoordinator, SharedStore, AuditRun) {
        let config = Arc::new(test_config());
        let client = build_http_client(&config).unwrap();
        let fetcher = PageFetcher::new(client, Arc::new(HostThrottle::new(config.crawl_delay)));
        let store = shared(MemoryStore::new());
        let run_id = lock_store(&store)
            .unwrap()
            .create_run(&NewRun {
                project_id: "test".to_string(),
                root_url: root.to_string(),
                max_pages_discovered: max_pages,
                max_pages_to_analyze: 1,
                config_hash: String::new(),
            })
            .unwrap();
        let run = lock_store(&store).unwrap().get_run(run_id).unwrap();
        (
            DiscoveryCoordinator::new(config, fetcher, store.clone()),
            store,
            run,
        )
    }

    fn urlset(urls: &[String]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<url><loc>{}</loc></url>", u))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        )
    }

    #[tokio::test]
    async fn test_discover_from_fallback_sitemap() {
        let server = MockServer::start().await;
        let base = server.uri();
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[
                format!("{}/a", base),
                format!("{}/b/", base),
                format!("{}/b?ref=x", base),
            ])))
            .mount(&server)
            .await;

        let (coordinator, store, run) = setup(&base, 100);
        let pages = coordinator.discover(&run, None).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.status == PageStatus::Pending));
        assert_eq!(pages[0].discovery_order, 0);
        assert!(pages[1].url.ends_with("/b"));
        assert_eq!(
            lock_store(&store).unwrap().get_run(run.id).unwrap().phase,
            RunPhase::Analyzing
        );
    }

    #[tokio::test]
    async fn test_disallowed_urls_are_filtered() {
        let server = MockServer::start().await;
        let base = server.uri();
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("User-agent: *\nDisallow: /private\nSitemap: {}/map.xml\n", base)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/map.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[
                format!("{}/public", base),
                format!("{}/private/x", base),
                "https://elsewhere.example/page".to_string(),
            ])))
            .mount(&server)
            .await;

        let (coordinator, _, run) = setup(&base, 100);
        let pages = coordinator.discover(&run, None).await.unwrap();
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec![format!("{}/public", base).as_str()]);
    }

    #[tokio::test]
    async fn test_root_fallback_when_robots_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
            .mount(&server)
            .await;

        let (coordinator, _, run) = setup(&server.uri(), 100);
        let pages = coordinator.discover(&run, None).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, normalize_url(&server.uri()).unwrap().to_string());
    }

    #[tokio::test]
    async fn test_unreachable_root_fails_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (coordinator, store, run) = setup(&server.uri(), 100);
        let result = coordinator.discover(&run, None).await;

        assert!(matches!(result, Err(AuditError::DiscoveryFailed { .. })));
        let store = lock_store(&store).unwrap();
        assert!(store.list_pages(run.id, None, None).unwrap().is_empty());
        let run = store.get_run(run.id).unwrap();
        assert_eq!(run.phase, RunPhase::Idle);
        assert!(run.last_error.is_some());
    }

    #[tokio::test]
    async fn test_robots_crawl_delay_raises_throttle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 0.25\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(urlset(&[format!("{}/a", server.uri())])),
            )
            .mount(&server)
            .await;

        let (coordinator, _, run) = setup(&server.uri(), 100);
        coordinator.discover(&run, None).await.unwrap();
        assert_eq!(coordinator.fetcher.throttle().delay(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_huge_crawl_delay_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1e30\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(urlset(&[format!("{}/a", server.uri())])),
            )
            .mount(&server)
            .await;

        let (coordinator, _, run) = setup(&server.uri(), 100);
        let pages = coordinator.discover(&run, None).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            coordinator.fetcher.throttle().delay(),
            coordinator.config.max_crawl_delay
        );
    }
}
