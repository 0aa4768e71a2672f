//! In-memory storage implementation
//!
//! Holds every record in ordered maps. Used by tests and by `--in-memory`
//! runs where nothing needs to survive the process.

use crate::analysis::PageAnalysis;
use crate::state::{AnalysisStatus, FetchStatus, PageStatus, RunPhase};
use crate::storage::traits::{check_transition, AuditStore, StoreError, StoreResult};
use crate::storage::{
    AssetAudit, AuditRun, LinkAudit, NewPage, NewRun, Page, PageAnalysisRecord, PagePatch,
    PerformanceAudit, StatusCounts,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Map-backed storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    runs: BTreeMap<i64, AuditRun>,
    pages: BTreeMap<i64, Page>,
    run_urls: HashSet<(i64, String)>,
    analyses: HashMap<i64, PageAnalysisRecord>,
    links: HashMap<i64, Vec<LinkAudit>>,
    assets: HashMap<i64, Vec<AssetAudit>>,
    performance: HashMap<i64, PerformanceAudit>,
    next_run_id: i64,
    next_page_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn run_mut(&mut self, run_id: i64) -> StoreResult<&mut AuditRun> {
        self.runs.get_mut(&run_id).ok_or(StoreError::RunNotFound(run_id))
    }

    fn ensure_page(&self, page_id: i64) -> StoreResult<()> {
        if self.pages.contains_key(&page_id) {
            Ok(())
        } else {
            Err(StoreError::PageNotFound(page_id))
        }
    }

    /// Drops a page's analysis and audit rows
    fn clear_results(&mut self, page_id: i64) {
        self.analyses.remove(&page_id);
        self.links.remove(&page_id);
        self.assets.remove(&page_id);
        self.performance.remove(&page_id);
    }

    /// Pages of a run sorted by discovery order
    fn run_pages(&self, run_id: i64) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.values().filter(|p| p.run_id == run_id).collect();
        pages.sort_by_key(|p| (p.discovery_order, p.id));
        pages
    }
}

impl AuditStore for MemoryStore {
    // ===== Run Management =====

    fn create_run(&mut self, run: &NewRun) -> StoreResult<i64> {
        self.next_run_id += 1;
        let id = self.next_run_id;
        self.runs.insert(
            id,
            AuditRun {
                id,
                project_id: run.project_id.clone(),
                root_url: run.root_url.clone(),
                max_pages_discovered: run.max_pages_discovered,
                max_pages_to_analyze: run.max_pages_to_analyze,
                phase: RunPhase::Discovering,
                config_hash: run.config_hash.clone(),
                started_at: Utc::now(),
                finished_at: None,
                last_error: None,
            },
        );
        Ok(id)
    }

    fn get_run(&self, run_id: i64) -> StoreResult<AuditRun> {
        self.runs
            .get(&run_id)
            .cloned()
            .ok_or(StoreError::RunNotFound(run_id))
    }

    fn update_run_phase(&mut self, run_id: i64, phase: RunPhase) -> StoreResult<()> {
        self.run_mut(run_id)?.phase = phase;
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64) -> StoreResult<()> {
        let run = self.run_mut(run_id)?;
        run.phase = RunPhase::Idle;
        run.finished_at = Some(Utc::now());
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error: &str) -> StoreResult<()> {
        let run = self.run_mut(run_id)?;
        run.phase = RunPhase::Idle;
        run.finished_at = Some(Utc::now());
        run.last_error = Some(error.to_string());
        Ok(())
    }

    // ===== Page Management =====

    fn create_pages(&mut self, run_id: i64, pages: &[NewPage]) -> StoreResult<Vec<i64>> {
        if !self.runs.contains_key(&run_id) {
            return Err(StoreError::RunNotFound(run_id));
        }

        // Validate the whole batch before touching anything
        let mut batch = HashSet::new();
        for page in pages {
            let key = (run_id, page.url.clone());
            if self.run_urls.contains(&key) || !batch.insert(key) {
                return Err(StoreError::DuplicatePage {
                    run_id,
                    url: page.url.clone(),
                });
            }
        }

        let now = Utc::now();
        let mut ids = Vec::with_capacity(pages.len());
        for page in pages {
            self.next_page_id += 1;
            let id = self.next_page_id;
            self.pages.insert(
                id,
                Page {
                    id,
                    run_id,
                    url: page.url.clone(),
                    status: PageStatus::Pending,
                    fetch_status: FetchStatus::NotFetched,
                    analysis_status: AnalysisStatus::NotAttempted,
                    discovery_order: page.discovery_order,
                    discovered_at: now,
                    analyzed_at: None,
                    last_error: None,
                },
            );
            self.run_urls.insert((run_id, page.url.clone()));
            ids.push(id);
        }
        Ok(ids)
    }

    fn get_page(&self, page_id: i64) -> StoreResult<Page> {
        self.pages
            .get(&page_id)
            .cloned()
            .ok_or(StoreError::PageNotFound(page_id))
    }

    fn list_pages(
        &self,
        run_id: i64,
        status: Option<PageStatus>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Page>> {
        Ok(self
            .run_pages(run_id)
            .into_iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn update_page(&mut self, page_id: i64, patch: &PagePatch) -> StoreResult<()> {
        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or(StoreError::PageNotFound(page_id))?;
        if let Some(next) = patch.status {
            check_transition(page_id, page.status, next)?;
        }
        patch.apply(page);
        Ok(())
    }

    fn claim_pending_pages(&mut self, run_id: i64, limit: usize) -> StoreResult<Vec<Page>> {
        let ids: Vec<i64> = self
            .run_pages(run_id)
            .into_iter()
            .filter(|p| p.status == PageStatus::Pending)
            .take(limit)
            .map(|p| p.id)
            .collect();

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(page) = self.pages.get_mut(&id) {
                page.status = PageStatus::Analyzing;
                claimed.push(page.clone());
            }
        }
        Ok(claimed)
    }

    fn claim_page(&mut self, page_id: i64) -> StoreResult<Page> {
        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or(StoreError::PageNotFound(page_id))?;
        if page.status != PageStatus::Pending {
            return Err(StoreError::InvalidTransition {
                page_id,
                from: page.status,
                to: PageStatus::Analyzing,
            });
        }
        page.status = PageStatus::Analyzing;
        Ok(page.clone())
    }

    fn reset_page(&mut self, page_id: i64) -> StoreResult<Page> {
        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or(StoreError::PageNotFound(page_id))?;
        if page.status != PageStatus::Pending {
            check_transition(page_id, page.status, PageStatus::Pending)?;
        }
        reset_outcome(page);
        let page = page.clone();
        self.clear_results(page_id);
        Ok(page)
    }

    fn reset_pages(&mut self, run_id: i64, from: PageStatus) -> StoreResult<usize> {
        let ids: Vec<i64> = self
            .pages
            .values()
            .filter(|p| p.run_id == run_id && p.status == from)
            .map(|p| p.id)
            .collect();

        for id in &ids {
            if let Some(page) = self.pages.get_mut(id) {
                reset_outcome(page);
            }
            self.clear_results(*id);
        }
        Ok(ids.len())
    }

    fn count_pages_by_status(&self, run_id: i64) -> StoreResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for page in self.pages.values().filter(|p| p.run_id == run_id) {
            counts.add(page.status, 1);
        }
        Ok(counts)
    }

    // ===== Analysis Results =====

    fn save_page_analysis(&mut self, page_id: i64, analysis: &PageAnalysis) -> StoreResult<()> {
        self.ensure_page(page_id)?;
        self.analyses.insert(
            page_id,
            PageAnalysisRecord {
                page_id,
                analysis: analysis.clone(),
                analyzed_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn get_page_analysis(&self, page_id: i64) -> StoreResult<Option<PageAnalysisRecord>> {
        Ok(self.analyses.get(&page_id).cloned())
    }

    fn list_analyses(&self, run_id: i64) -> StoreResult<Vec<PageAnalysisRecord>> {
        Ok(self
            .run_pages(run_id)
            .into_iter()
            .filter_map(|p| self.analyses.get(&p.id).cloned())
            .collect())
    }

    // ===== Link / Asset / Performance Audits =====

    fn save_link_audits(&mut self, page_id: i64, links: &[LinkAudit]) -> StoreResult<()> {
        self.ensure_page(page_id)?;
        let rows = links
            .iter()
            .map(|l| LinkAudit {
                page_id,
                ..l.clone()
            })
            .collect();
        self.links.insert(page_id, rows);
        Ok(())
    }

    fn save_asset_audits(&mut self, page_id: i64, assets: &[AssetAudit]) -> StoreResult<()> {
        self.ensure_page(page_id)?;
        let rows = assets
            .iter()
            .map(|a| AssetAudit {
                page_id,
                ..a.clone()
            })
            .collect();
        self.assets.insert(page_id, rows);
        Ok(())
    }

    fn save_performance_audit(&mut self, audit: &PerformanceAudit) -> StoreResult<()> {
        self.ensure_page(audit.page_id)?;
        self.performance.insert(audit.page_id, audit.clone());
        Ok(())
    }

    fn list_link_audits(&self, page_id: i64) -> StoreResult<Vec<LinkAudit>> {
        Ok(self.links.get(&page_id).cloned().unwrap_or_default())
    }

    fn list_asset_audits(&self, page_id: i64) -> StoreResult<Vec<AssetAudit>> {
        Ok(self.assets.get(&page_id).cloned().unwrap_or_default())
    }

    fn get_performance_audit(&self, page_id: i64) -> StoreResult<Option<PerformanceAudit>> {
        Ok(self.performance.get(&page_id).cloned())
    }
}

fn reset_outcome(page: &mut Page) {
    page.status = PageStatus::Pending;
    page.fetch_status = FetchStatus::NotFetched;
    page.analysis_status = AnalysisStatus::NotAttempted;
    page.analyzed_at = None;
    page.last_error = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AssetKind;

    fn seeded(n: usize) -> (MemoryStore, i64, Vec<i64>) {
        let mut store = MemoryStore::new();
        let run_id = store
            .create_run(&NewRun {
                project_id: "p".to_string(),
                root_url: "https://example.com/".to_string(),
                max_pages_discovered: 10,
                max_pages_to_analyze: 2,
                config_hash: String::new(),
            })
            .unwrap();
        let pages: Vec<NewPage> = (0..n)
            .map(|i| NewPage {
                url: format!("https://example.com/{}", i),
                discovery_order: i as i64,
            })
            .collect();
        let ids = store.create_pages(run_id, &pages).unwrap();
        (store, run_id, ids)
    }

    #[test]
    fn test_duplicate_batch_is_rejected_whole() {
        let (mut store, run_id, _) = seeded(1);
        let batch = vec![
            NewPage {
                url: "https://example.com/new".to_string(),
                discovery_order: 1,
            },
            NewPage {
                url: "https://example.com/0".to_string(),
                discovery_order: 2,
            },
        ];
        assert!(matches!(
            store.create_pages(run_id, &batch),
            Err(StoreError::DuplicatePage { .. })
        ));
        assert_eq!(store.list_pages(run_id, None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_create_pages_unknown_run() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.create_pages(7, &[]),
            Err(StoreError::RunNotFound(7))
        ));
    }

    #[test]
    fn test_claim_never_returns_same_page_twice() {
        let (mut store, run_id, _) = seeded(3);
        let a = store.claim_pending_pages(run_id, 2).unwrap();
        let b = store.claim_pending_pages(run_id, 2).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert!(a.iter().all(|p| p.id != b[0].id));
        assert_eq!(store.count_pages_by_status(run_id).unwrap().analyzing, 3);
    }

    #[test]
    fn test_reset_failed_pages() {
        let (mut store, run_id, ids) = seeded(2);
        store.claim_page(ids[1]).unwrap();
        store
            .update_page(ids[1], &PagePatch::status(PageStatus::Failed).error("timeout"))
            .unwrap();
        store
            .save_performance_audit(&PerformanceAudit {
                page_id: ids[1],
                status_code: 200,
                response_time_ms: 40,
                content_length: None,
                html_bytes: 10,
            })
            .unwrap();
        assert_eq!(store.reset_pages(run_id, PageStatus::Failed).unwrap(), 1);
        let page = store.get_page(ids[1]).unwrap();
        assert_eq!(page.status, PageStatus::Pending);
        assert!(page.last_error.is_none());
        assert!(store.get_performance_audit(ids[1]).unwrap().is_none());
    }

    #[test]
    fn test_update_page_enforces_state_machine() {
        let (mut store, _, ids) = seeded(1);
        assert!(matches!(
            store.update_page(ids[0], &PagePatch::status(PageStatus::Analyzed)),
            Err(StoreError::InvalidTransition {
                from: PageStatus::Pending,
                to: PageStatus::Analyzed,
                ..
            })
        ));
        assert_eq!(store.get_page(ids[0]).unwrap().status, PageStatus::Pending);

        store.claim_page(ids[0]).unwrap();
        store
            .update_page(ids[0], &PagePatch::status(PageStatus::Failed))
            .unwrap();
        assert!(matches!(
            store.update_page(ids[0], &PagePatch::status(PageStatus::Analyzing)),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.claim_page(ids[0]),
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_reset_page_clears_results() {
        let (mut store, _, ids) = seeded(1);
        store.claim_page(ids[0]).unwrap();
        store
            .save_page_analysis(
                ids[0],
                &PageAnalysis {
                    score: 70,
                    issues: Vec::new(),
                    metadata_snapshot: Default::default(),
                    analyzer: "rules".to_string(),
                },
            )
            .unwrap();
        store
            .save_link_audits(
                ids[0],
                &[LinkAudit {
                    page_id: ids[0],
                    href: "https://example.com/about".to_string(),
                    anchor_text: "About".to_string(),
                    is_internal: true,
                    nofollow: false,
                }],
            )
            .unwrap();
        store
            .update_page(ids[0], &PagePatch::status(PageStatus::Analyzed).analyzed_now())
            .unwrap();

        let page = store.reset_page(ids[0]).unwrap();
        assert_eq!(page.status, PageStatus::Pending);
        assert!(page.analyzed_at.is_none());
        assert!(store.get_page_analysis(ids[0]).unwrap().is_none());
        assert!(store.list_link_audits(ids[0]).unwrap().is_empty());
        assert_eq!(store.claim_page(ids[0]).unwrap().status, PageStatus::Analyzing);
    }

    #[test]
    fn test_audit_rows_are_stored_under_page() {
        let (mut store, _, ids) = seeded(1);
        store
            .save_asset_audits(
                ids[0],
                &[AssetAudit {
                    page_id: 999,
                    src: "https://example.com/app.js".to_string(),
                    alt: None,
                    kind: AssetKind::Script,
                }],
            )
            .unwrap();
        assert_eq!(store.list_asset_audits(ids[0]).unwrap()[0].page_id, ids[0]);
        assert!(store.save_link_audits(999, &[]).is_err());
    }
}
