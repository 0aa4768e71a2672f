//! Analysis coordinator
//!
//! Processes claimed pages in fixed-size batches. Fetches to the audited
//! host run one at a time through the host throttle; analyzer calls for
//! already-fetched pages run concurrently with the next fetch, bounded by
//! the batch size.

use crate::analysis::{AnalysisInput, AnalyzerError, PageAnalysis, PageAnalyzer};
use crate::audit::result::{BatchSummary, PageProcessingResult};
use crate::config::AuditConfig;
use crate::crawler::{ExtractedPage, FetchedPage, PageExtractor, PageFetcher};
use crate::state::{AnalysisStatus, FetchStatus, PageStatus};
use crate::storage::{
    lock_store, AssetAudit, AssetKind, AuditStore, LinkAudit, Page, PagePatch, PerformanceAudit,
    SharedStore, StoreError,
};
use crate::AuditError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// What an analyzer task hands back
type AnalyzerOutcome = (i64, Result<PageAnalysis, AnalyzerError>);

/// Runs the fetch → extract → analyze → persist pipeline for claimed pages
pub struct AnalysisCoordinator {
    config: Arc<AuditConfig>,
    fetcher: PageFetcher,
    extractor: Arc<dyn PageExtractor>,
    analyzer: Arc<dyn PageAnalyzer>,
    store: SharedStore,
}

impl AnalysisCoordinator {
    pub fn new(
        config: Arc<AuditConfig>,
        fetcher: PageFetcher,
        extractor: Arc<dyn PageExtractor>,
        analyzer: Arc<dyn PageAnalyzer>,
        store: SharedStore,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            analyzer,
            store,
        }
    }

    /// Analyzes pages already claimed (ANALYZING) for a run
    ///
    /// Pages are taken in ascending discovery order and processed in chunks
    /// of `batch_size`. Page-scoped failures are recorded on the page and
    /// never returned; only store failures propagate.
    ///
    /// # Arguments
    ///
    /// * `run_id` - The run the pages belong to
    /// * `pages` - Claimed pages
    ///
    /// # Returns
    ///
    /// * `Ok(BatchSummary)` - Counts plus per-page results in discovery order
    /// * `Err(AuditError::Store)` - A write failed; the summary would be unreliable
    pub async fn analyze_batch(
        &self,
        run_id: i64,
        mut pages: Vec<Page>,
    ) -> Result<BatchSummary, AuditError> {
        pages.sort_by_key(|p| (p.discovery_order, p.id));

        let mut summary = BatchSummary::default();
        let batch_size = self.config.batch_size.max(1);

        for chunk in pages.chunks(batch_size) {
            self.process_chunk(run_id, chunk, &mut summary).await?;
        }

        summary.pages.sort_by_key(|r| (r.discovery_order, r.page_id));

        tracing::info!(
            "Run {}: batch finished ({} analyzed, {} failed, {} skipped)",
            run_id,
            summary.analyzed,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    async fn process_chunk(
        &self,
        run_id: i64,
        chunk: &[Page],
        summary: &mut BatchSummary,
    ) -> Result<(), AuditError> {
        let mut in_flight: JoinSet<AnalyzerOutcome> = JoinSet::new();
        let mut awaiting: HashMap<i64, Page> = HashMap::new();

        for claimed in chunk {
            let Some(page) = self.still_claimed(run_id, claimed)? else {
                summary.skipped += 1;
                continue;
            };

            let (fetched, extracted) = match self.fetch_and_extract(&page).await {
                Ok(ok) => ok,
                Err(failure) => {
                    summary.record(self.fail_page(&page, failure)?);
                    continue;
                }
            };

            self.save_page_audits(&page, &fetched, &extracted)?;

            let input = AnalysisInput {
                url: page.url.clone(),
                status_code: fetched.status_code,
                response_time_ms: fetched.response_time_ms,
                content_length: fetched.content_length,
                html_bytes: fetched.body.len(),
                page: extracted,
            };

            let analyzer = Arc::clone(&self.analyzer);
            let timeout = self.config.analysis_timeout;
            let page_id = page.id;
            in_flight.spawn(async move {
                let result = match tokio::time::timeout(timeout, analyzer.analyze(&input)).await {
                    Ok(result) => result,
                    Err(_) => Err(AnalyzerError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                };
                (page_id, result)
            });
            awaiting.insert(page.id, page);
        }

        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok((page_id, result)) => {
                    let Some(page) = awaiting.remove(&page_id) else {
                        continue;
                    };
                    summary.record(self.finish_page(&page, result)?);
                }
                Err(e) => tracing::error!("Analyzer task panicked: {}", e),
            }
        }

        // Pages whose analyzer task died without reporting
        for (_, page) in awaiting.drain() {
            let failure = PageFailure::Analyzer(AnalyzerError::Request(
                "analyzer task aborted".to_string(),
            ));
            summary.record(self.fail_page(&page, failure)?);
        }

        Ok(())
    }

    /// Re-reads a page and returns it only if it is still claimed by this run
    fn still_claimed(&self, run_id: i64, claimed: &Page) -> Result<Option<Page>, AuditError> {
        let page = lock_store(&self.store)?.get_page(claimed.id)?;
        if page.run_id != run_id || page.status != PageStatus::Analyzing {
            tracing::debug!(
                "Skipping page {} ({}): status is {}",
                page.id,
                page.url,
                page.status
            );
            return Ok(None);
        }
        Ok(Some(page))
    }

    async fn fetch_and_extract(
        &self,
        page: &Page,
    ) -> Result<(FetchedPage, ExtractedPage), PageFailure> {
        let url = Url::parse(&page.url).map_err(|e| PageFailure::Fetch(e.to_string()))?;

        let fetched = self
            .fetcher
            .fetch_page(&url, self.config.page_fetch_timeout)
            .await
            .map_err(|e| PageFailure::Fetch(e.to_string()))?;

        let extracted = self
            .extractor
            .extract(&fetched.body, &fetched.final_url)
            .map_err(|e| PageFailure::Extraction(e.to_string()))?;

        Ok((fetched, extracted))
    }

    /// Persists link, asset and performance rows for a fetched page
    fn save_page_audits(
        &self,
        page: &Page,
        fetched: &FetchedPage,
        extracted: &ExtractedPage,
    ) -> Result<(), AuditError> {
        let links: Vec<LinkAudit> = extracted
            .links
            .iter()
            .map(|link| LinkAudit {
                page_id: page.id,
                href: link.href.clone(),
                anchor_text: link.anchor_text.clone(),
                is_internal: link.is_internal,
                nofollow: link.nofollow,
            })
            .collect();

        let images = extracted.images.iter().map(|img| AssetAudit {
            page_id: page.id,
            src: img.src.clone(),
            alt: img.alt.clone(),
            kind: AssetKind::Image,
        });
        let scripts = extracted.scripts.iter().map(|src| AssetAudit {
            page_id: page.id,
            src: src.clone(),
            alt: None,
            kind: AssetKind::Script,
        });
        let stylesheets = extracted.stylesheets.iter().map(|src| AssetAudit {
            page_id: page.id,
            src: src.clone(),
            alt: None,
            kind: AssetKind::Stylesheet,
        });
        let assets: Vec<AssetAudit> = images.chain(scripts).chain(stylesheets).collect();

        let performance = PerformanceAudit {
            page_id: page.id,
            status_code: fetched.status_code,
            response_time_ms: fetched.response_time_ms,
            content_length: fetched.content_length,
            html_bytes: fetched.body.len(),
        };

        let mut store = lock_store(&self.store)?;
        store.save_link_audits(page.id, &links)?;
        store.save_asset_audits(page.id, &assets)?;
        store.save_performance_audit(&performance)?;
        store.update_page(page.id, &PagePatch::default().fetch_status(FetchStatus::Fetched))?;
        Ok(())
    }

    fn finish_page(
        &self,
        page: &Page,
        result: Result<PageAnalysis, AnalyzerError>,
    ) -> Result<Option<PageProcessingResult>, AuditError> {
        let analysis = match result {
            Ok(analysis) => analysis,
            Err(e) => return self.fail_page(page, PageFailure::Analyzer(e)),
        };

        {
            let mut store = lock_store(&self.store)?;
            let settled = settle(
                &mut *store,
                page,
                &PagePatch::status(PageStatus::Analyzed)
                    .fetch_status(FetchStatus::Fetched)
                    .analysis_status(AnalysisStatus::Analyzed)
                    .analyzed_now()
                    .clear_error(),
            )?;
            if !settled {
                return Ok(None);
            }
            store.save_page_analysis(page.id, &analysis)?;
        }

        tracing::debug!(
            "Analyzed {} (score {}, {} issues)",
            page.url,
            analysis.score,
            analysis.issues.len()
        );

        Ok(Some(PageProcessingResult {
            page_id: page.id,
            url: page.url.clone(),
            discovery_order: page.discovery_order,
            status: PageStatus::Analyzed,
            fetch_status: FetchStatus::Fetched,
            analysis_status: AnalysisStatus::Analyzed,
            score: Some(analysis.score),
            issue_count: analysis.issues.len(),
            error: None,
        }))
    }

    fn fail_page(
        &self,
        page: &Page,
        failure: PageFailure,
    ) -> Result<Option<PageProcessingResult>, AuditError> {
        let (fetch_status, analysis_status) = failure.statuses();
        let message = failure.to_string();
        tracing::warn!("Page {} failed: {}", page.url, message);

        let settled = settle(
            &mut *lock_store(&self.store)?,
            page,
            &PagePatch::status(PageStatus::Failed)
                .fetch_status(fetch_status)
                .analysis_status(analysis_status)
                .error(message.clone()),
        )?;
        if !settled {
            return Ok(None);
        }

        Ok(Some(PageProcessingResult {
            page_id: page.id,
            url: page.url.clone(),
            discovery_order: page.discovery_order,
            status: PageStatus::Failed,
            fetch_status,
            analysis_status,
            score: None,
            issue_count: 0,
            error: Some(message),
        }))
    }
}

/// Writes a page's final status
///
/// Returns `false` when the page was moved out of ANALYZING by someone else
/// (for example `recover_interrupted_pages`) while this batch held it.
fn settle(store: &mut dyn AuditStore, page: &Page, patch: &PagePatch) -> Result<bool, AuditError> {
    match store.update_page(page.id, patch) {
        Ok(()) => Ok(true),
        Err(StoreError::InvalidTransition { from, .. }) => {
            tracing::warn!("Page {} was released during analysis (now {})", page.url, from);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Why a single page failed
#[derive(Debug)]
enum PageFailure {
    Fetch(String),
    Extraction(String),
    Analyzer(AnalyzerError),
}

impl PageFailure {
    fn statuses(&self) -> (FetchStatus, AnalysisStatus) {
        match self {
            Self::Fetch(_) => (FetchStatus::FetchFailed, AnalysisStatus::NotAttempted),
            Self::Extraction(_) => (FetchStatus::FetchFailed, AnalysisStatus::NotAttempted),
            Self::Analyzer(_) => (FetchStatus::Fetched, AnalysisStatus::AnalysisFailed),
        }
    }
}

impl std::fmt::Display for PageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e),
            Self::Extraction(e) => write!(f, "Extraction failed: {}", e),
            Self::Analyzer(e) => write!(f, "Analyzer failed: {}", e),
        }
    }
}
