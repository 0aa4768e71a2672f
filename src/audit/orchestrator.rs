//! Audit orchestrator - top-level entry points of the audit engine
//!
//! `run_audit` discovers a site and analyzes the first batch; everything
//! else re-enters analysis for a run that already exists.

use crate::analysis::PageAnalyzer;
use crate::audit::analysis::AnalysisCoordinator;
use crate::audit::discovery::DiscoveryCoordinator;
use crate::audit::result::{
    AuditRequest, AuditResult, PageProcessingResult, RunStatus, ScanMorePagesResult,
};
use crate::config::AuditConfig;
use crate::crawler::{
    build_http_client, effective_delay, HostThrottle, HtmlExtractor, PageExtractor, PageFetcher,
};
use crate::robots::RobotsResolver;
use crate::state::{PageStatus, RunPhase};
use crate::storage::{lock_store, AuditRun, NewRun, SharedStore, StatusCounts, StoreError};
use crate::url::{normalize_url, site_host};
use crate::AuditError;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Main audit engine structure
pub struct AuditOrchestrator {
    config: Arc<AuditConfig>,
    store: SharedStore,
    analyzer: Arc<dyn PageAnalyzer>,
    extractor: Arc<dyn PageExtractor>,
    client: Client,
    /// One throttle per audited host, shared by every operation on it
    throttles: Mutex<HashMap<String, Arc<HostThrottle>>>,
    config_hash: String,
}

impl AuditOrchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - Runtime audit settings
    /// * `store` - The shared audit store
    /// * `analyzer` - The analyzer that scores fetched pages
    ///
    /// # Returns
    ///
    /// * `Ok(AuditOrchestrator)` - Ready to run audits
    /// * `Err(AuditError::Http)` - The HTTP client could not be built
    pub fn new(
        config: AuditConfig,
        store: SharedStore,
        analyzer: Arc<dyn PageAnalyzer>,
    ) -> Result<Self, AuditError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            analyzer,
            extractor: Arc::new(HtmlExtractor::new()),
            client,
            throttles: Mutex::new(HashMap::new()),
            config_hash: String::new(),
        })
    }

    /// Records a configuration digest on every new run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Runs discovery and the first analysis batch
    ///
    /// # Audit Flow
    ///
    /// 1. Create the run (DISCOVERING)
    /// 2. Discover and persist every page as PENDING
    /// 3. Claim the first `max_pages_to_analyze` pages by discovery order
    /// 4. Analyze them; the rest stay PENDING for `scan_more_pages`
    ///
    /// # Returns
    ///
    /// * `Ok(AuditResult)` - Totals; `failed` may be non-zero on success
    /// * `Err(AuditError::DiscoveryFailed)` - Nothing could be discovered
    /// * `Err(AuditError::Store)` - A store write failed
    pub async fn run_audit(&self, request: AuditRequest) -> Result<AuditResult, AuditError> {
        let root = normalize_url(&request.root_url)?;
        let max_pages_discovered = request
            .max_pages_discovered
            .unwrap_or(self.config.default_max_pages)
            .max(1);
        let max_pages_to_analyze = request
            .max_pages_to_analyze
            .unwrap_or(self.config.default_max_pages_to_scan);

        let run = {
            let mut store = lock_store(&self.store)?;
            let run_id = store.create_run(&NewRun {
                project_id: request.project_id.clone(),
                root_url: root.to_string(),
                max_pages_discovered,
                max_pages_to_analyze,
                config_hash: self.config_hash.clone(),
            })?;
            store.get_run(run_id)?
        };
        tracing::info!("Starting audit run {} for {}", run.id, root);

        let fetcher = self.fetcher_for(&root)?;
        let discovered = DiscoveryCoordinator::new(
            Arc::clone(&self.config),
            fetcher.clone(),
            self.store.clone(),
        )
        .discover(&run, request.sitemap_url.as_deref())
        .await?;

        let limit = max_pages_to_analyze.min(discovered.len());
        let claimed = lock_store(&self.store)?.claim_pending_pages(run.id, limit)?;
        let summary = self.analysis(fetcher).analyze_batch(run.id, claimed).await?;

        let counts = finish_if_settled(&self.store, run.id)?;

        let result = AuditResult {
            run_id: run.id,
            discovered: discovered.len(),
            analyzed: summary.analyzed,
            failed: summary.failed,
            pending: counts.pending,
        };
        tracing::info!(
            "Audit run {}: {} discovered, {} analyzed, {} failed, {} pending",
            result.run_id,
            result.discovered,
            result.analyzed,
            result.failed,
            result.pending
        );
        Ok(result)
    }

    /// Analyzes the next `count` PENDING pages of a run
    ///
    /// Pages are claimed atomically, so concurrent callers on the same run
    /// never process the same page. FAILED pages are not retried; see
    /// `retry_failed_pages`.
    pub async fn scan_more_pages(
        &self,
        run_id: i64,
        count: usize,
    ) -> Result<ScanMorePagesResult, AuditError> {
        let run = self.load_run(run_id)?;

        let claimed = {
            let mut store = lock_store(&self.store)?;
            let claimed = store.claim_pending_pages(run_id, count)?;
            if !claimed.is_empty() {
                store.update_run_phase(run_id, RunPhase::Analyzing)?;
            }
            claimed
        };

        if claimed.is_empty() {
            tracing::info!("Run {}: no pending pages left", run_id);
            let pending = lock_store(&self.store)?.count_pages_by_status(run_id)?.pending;
            return Ok(ScanMorePagesResult {
                pending,
                ..Default::default()
            });
        }

        tracing::info!("Run {}: scanning {} more pages", run_id, claimed.len());
        let fetcher = self.resume_fetcher(&run).await?;
        let summary = self.analysis(fetcher).analyze_batch(run_id, claimed).await?;

        let counts = finish_if_settled(&self.store, run_id)?;

        Ok(ScanMorePagesResult {
            analyzed: summary.analyzed,
            failed: summary.failed,
            pending: counts.pending,
        })
    }

    /// Re-analyzes one stored page regardless of its current outcome
    ///
    /// A page that is ANALYZING belongs to an in-flight batch and is refused
    /// with `PageBusy`.
    pub async fn analyze_stored_page(
        &self,
        page_id: i64,
    ) -> Result<PageProcessingResult, AuditError> {
        let (run, page) = {
            let mut store = lock_store(&self.store)?;
            let page = store.get_page(page_id).map_err(|e| match e {
                StoreError::PageNotFound(id) => AuditError::PageNotFound(id),
                other => other.into(),
            })?;
            if page.status == PageStatus::Analyzing {
                return Err(AuditError::PageBusy(page_id));
            }

            // Back through PENDING so the previous outcome and its rows are dropped
            store.reset_page(page_id)?;
            let page = store.claim_page(page_id)?;

            store.update_run_phase(page.run_id, RunPhase::Analyzing)?;
            (store.get_run(page.run_id)?, page)
        };

        let fetcher = self.resume_fetcher(&run).await?;
        let summary = self
            .analysis(fetcher)
            .analyze_batch(run.id, vec![page])
            .await?;
        finish_if_settled(&self.store, run.id)?;

        summary
            .pages
            .into_iter()
            .next()
            .ok_or(AuditError::PageBusy(page_id))
    }

    /// Resets every FAILED page of a run to PENDING
    ///
    /// # Returns
    ///
    /// The number of pages that `scan_more_pages` will pick up again
    pub fn retry_failed_pages(&self, run_id: i64) -> Result<usize, AuditError> {
        self.load_run(run_id)?;
        let reset = lock_store(&self.store)?.reset_pages(run_id, PageStatus::Failed)?;
        tracing::info!("Run {}: {} failed pages queued for retry", run_id, reset);
        Ok(reset)
    }

    /// Resets pages left ANALYZING by an interrupted process to PENDING
    pub fn recover_interrupted_pages(&self, run_id: i64) -> Result<usize, AuditError> {
        self.load_run(run_id)?;
        let recovered = {
            let mut store = lock_store(&self.store)?;
            let recovered = store.reset_pages(run_id, PageStatus::Analyzing)?;
            if store.get_run(run_id)?.phase != RunPhase::Idle {
                store.finish_run(run_id)?;
            }
            recovered
        };
        if recovered > 0 {
            tracing::warn!("Run {}: recovered {} interrupted pages", run_id, recovered);
        }
        Ok(recovered)
    }

    /// Returns a run and its page counts
    pub fn run_status(&self, run_id: i64) -> Result<RunStatus, AuditError> {
        let run = self.load_run(run_id)?;
        let counts = lock_store(&self.store)?.count_pages_by_status(run_id)?;
        Ok(RunStatus { run, counts })
    }

    fn load_run(&self, run_id: i64) -> Result<AuditRun, AuditError> {
        lock_store(&self.store)?
            .get_run(run_id)
            .map_err(|e| match e {
                StoreError::RunNotFound(id) => AuditError::RunNotFound(id),
                other => other.into(),
            })
    }

    fn analysis(&self, fetcher: PageFetcher) -> AnalysisCoordinator {
        AnalysisCoordinator::new(
            Arc::clone(&self.config),
            fetcher,
            Arc::clone(&self.extractor),
            Arc::clone(&self.analyzer),
            self.store.clone(),
        )
    }

    /// Returns a fetcher using the host's shared throttle
    fn fetcher_for(&self, root: &Url) -> Result<PageFetcher, AuditError> {
        Ok(PageFetcher::new(self.client.clone(), self.throttle_for(root)?.0))
    }

    /// Returns the host's throttle and whether it was just created
    fn throttle_for(&self, root: &Url) -> Result<(Arc<HostThrottle>, bool), AuditError> {
        let host = site_host(root).unwrap_or_default();
        let mut throttles = self
            .throttles
            .lock()
            .map_err(|_| AuditError::Store(StoreError::Poisoned))?;
        if let Some(throttle) = throttles.get(&host) {
            return Ok((Arc::clone(throttle), false));
        }
        let throttle = Arc::new(HostThrottle::new(self.config.crawl_delay));
        throttles.insert(host, Arc::clone(&throttle));
        Ok((throttle, true))
    }

    /// Fetcher for re-entering analysis on an existing run
    ///
    /// When this process has not talked to the host yet, robots.txt is read
    /// again so a declared Crawl-delay still applies.
    async fn resume_fetcher(&self, run: &AuditRun) -> Result<PageFetcher, AuditError> {
        let root = normalize_url(&run.root_url)?;
        let (throttle, fresh) = self.throttle_for(&root)?;
        let fetcher = PageFetcher::new(self.client.clone(), Arc::clone(&throttle));

        if fresh && self.config.respect_robots_crawl_delay {
            let robots = RobotsResolver::new(
                fetcher.clone(),
                self.config.robots_agent.clone(),
                self.config.robots_fetch_timeout,
            )
            .resolve(&root)
            .await;
            throttle.raise_delay(effective_delay(
                throttle.delay(),
                robots.crawl_delay(),
                self.config.max_crawl_delay,
            ));
        }

        Ok(fetcher)
    }
}

/// Returns the run to IDLE unless another batch still holds ANALYZING pages
fn finish_if_settled(store: &SharedStore, run_id: i64) -> Result<StatusCounts, AuditError> {
    let mut store = lock_store(store)?;
    let counts = store.count_pages_by_status(run_id)?;
    if counts.analyzing == 0 {
        store.finish_run(run_id)?;
    }
    Ok(counts)
}
