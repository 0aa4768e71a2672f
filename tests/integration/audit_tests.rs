//! Integration tests for the audit engine
//!
//! These tests use wiremock to stand in for the audited site and drive
//! discovery and analysis end-to-end.

use async_trait::async_trait;
use site_audit::analysis::{AnalysisInput, AnalyzerError, PageAnalysis, PageAnalyzer, RuleBasedAnalyzer};
use site_audit::audit::{AuditOrchestrator, AuditRequest};
use site_audit::config::AuditConfig;
use site_audit::output::build_run_report;
use site_audit::state::{AnalysisStatus, FetchStatus, PageStatus, RunPhase};
use site_audit::storage::{lock_store, shared, MemoryStore, SharedStore, SqliteStore};
use site_audit::AuditError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const PAGE_HTML: &str = r#"<html lang="en"><head>
    <title>Widgets and gadgets for every home</title>
    <meta name="description" content="Everything you need to know about widgets, gadgets and how to pick them.">
    </head><body>
    <h1>Widgets</h1>
    <a href="/about">About us</a>
    <a href="https://elsewhere.example/">Partner</a>
    <img src="/hero.png">
    <img src="/logo.png" alt="Logo">
    </body></html>"#;

fn html() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(PAGE_HTML, "text/html; charset=utf-8")
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

fn sitemap_index(children: &[String]) -> String {
    let entries: String = children
        .iter()
        .map(|u| format!("<sitemap><loc>{}</loc></sitemap>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/xml")
}

/// Creates a test configuration with short delays and timeouts
fn test_config() -> AuditConfig {
    AuditConfig {
        crawl_delay: Duration::from_millis(5),
        page_fetch_timeout: Duration::from_millis(500),
        robots_fetch_timeout: Duration::from_millis(500),
        analysis_timeout: Duration::from_secs(5),
        ..AuditConfig::default()
    }
}

fn orchestrator_with(
    config: AuditConfig,
    store: SharedStore,
    analyzer: Arc<dyn PageAnalyzer>,
) -> AuditOrchestrator {
    AuditOrchestrator::new(config, store, analyzer).expect("Failed to build orchestrator")
}

fn orchestrator(store: SharedStore) -> AuditOrchestrator {
    orchestrator_with(test_config(), store, Arc::new(RuleBasedAnalyzer::new()))
}

/// Mounts a fallback `/sitemap.xml` listing the given paths
async fn mount_sitemap(server: &MockServer, paths: &[&str]) {
    let urls: Vec<String> = paths.iter().map(|p| format!("{}{}", server.uri(), p)).collect();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml(urlset(&urls)))
        .mount(server)
        .await;
}

/// Serves a 404 for robots.txt so catch-all page mocks only see page fetches
async fn mount_no_robots(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// Records every page request the mock site receives
#[derive(Clone, Default)]
struct PageLog {
    hits: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl PageLog {
    fn paths(&self) -> Vec<String> {
        self.hits.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    fn instants(&self) -> Vec<Instant> {
        self.hits.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl Respond for PageLog {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.hits
            .lock()
            .unwrap()
            .push((request.url.path().to_string(), Instant::now()));
        html()
    }
}

struct FailingAnalyzer;

#[async_trait]
impl PageAnalyzer for FailingAnalyzer {
    async fn analyze(&self, _input: &AnalysisInput) -> Result<PageAnalysis, AnalyzerError> {
        Err(AnalyzerError::MalformedResponse("score missing".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_example_scenario() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nAllow: /\nSitemap: {}/sitemap_index.xml\n",
            base
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(xml(sitemap_index(&[
            format!("{}/sitemap-pages.xml", base),
            format!("{}/sitemap-blog.xml", base),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-pages.xml"))
        .respond_with(xml(urlset(&[
            format!("{}/", base),
            format!("{}/about", base),
            format!("{}/blog", base),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-blog.xml"))
        .respond_with(xml(urlset(&[
            format!("{}/blog/", base),
            format!("{}/blog/first-post", base),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());

    let result = orchestrator
        .run_audit(
            AuditRequest::new("acme", base.clone())
                .max_pages_discovered(100)
                .max_pages_to_analyze(2),
        )
        .await
        .expect("Audit failed");

    assert_eq!(result.discovered, 4);
    assert_eq!(result.analyzed, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(result.pending, 2);

    // Every discovered page is visible right away, analyzed or not
    {
        let store = lock_store(&store).unwrap();
        let pages = store.list_pages(result.run_id, None, None).unwrap();
        assert_eq!(pages.len(), 4);
        let statuses: Vec<PageStatus> = pages.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                PageStatus::Analyzed,
                PageStatus::Analyzed,
                PageStatus::Pending,
                PageStatus::Pending
            ]
        );
        assert_eq!(store.get_run(result.run_id).unwrap().phase, RunPhase::Idle);
    }

    let more = orchestrator
        .scan_more_pages(result.run_id, 10)
        .await
        .expect("Scan failed");
    assert_eq!(more.analyzed, 2);
    assert_eq!(more.failed, 0);
    assert_eq!(more.pending, 0);
}

#[tokio::test]
async fn test_discovery_dedup() {
    let server = MockServer::start().await;
    mount_sitemap(
        &server,
        &["/a", "/a/", "/a?utm_source=news", "/a#top", "/b", "/b/"],
    )
    .await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let result = orchestrator(store.clone())
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(0))
        .await
        .unwrap();

    assert_eq!(result.discovered, 2);
    let pages = lock_store(&store)
        .unwrap()
        .list_pages(result.run_id, None, None)
        .unwrap();
    let urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        urls,
        vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())]
    );
}

#[tokio::test]
async fn test_discovery_cap_keeps_first_entries() {
    let server = MockServer::start().await;
    let paths: Vec<String> = (0..200).map(|i| format!("/page-{}", i)).collect();
    let refs: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
    mount_sitemap(&server, &refs).await;

    let store = shared(MemoryStore::new());
    let result = orchestrator(store.clone())
        .run_audit(
            AuditRequest::new("p", server.uri())
                .max_pages_discovered(25)
                .max_pages_to_analyze(0),
        )
        .await
        .unwrap();

    assert_eq!(result.discovered, 25);
    assert_eq!(result.pending, 25);
    let pages = lock_store(&store)
        .unwrap()
        .list_pages(result.run_id, None, None)
        .unwrap();
    assert_eq!(pages[0].url, format!("{}/page-0", server.uri()));
    assert_eq!(pages[24].url, format!("{}/page-24", server.uri()));
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/one", "/two", "/three"]).await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(html().set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let result = orchestrator(store.clone())
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(3))
        .await
        .expect("A page timeout must not fail the batch");

    assert_eq!(result.analyzed, 2);
    assert_eq!(result.failed, 1);

    let store = lock_store(&store).unwrap();
    let pages = store.list_pages(result.run_id, None, None).unwrap();
    assert_eq!(pages[0].status, PageStatus::Analyzed);
    assert_eq!(pages[1].status, PageStatus::Failed);
    assert_eq!(pages[1].fetch_status, FetchStatus::FetchFailed);
    assert!(pages[1].last_error.as_deref().unwrap().contains("timed out"));
    assert_eq!(pages[2].status, PageStatus::Analyzed);
}

#[tokio::test]
async fn test_resume_until_done_analyzes_each_page_once() {
    let server = MockServer::start().await;
    let paths = ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6", "/p7"];
    mount_sitemap(&server, &paths).await;
    mount_no_robots(&server).await;
    let log = PageLog::default();
    Mock::given(method("GET"))
        .respond_with(log.clone())
        .mount(&server)
        .await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(2))
        .await
        .unwrap();

    let mut analyzed = result.analyzed;
    let mut rounds = 0;
    loop {
        let more = orchestrator.scan_more_pages(result.run_id, 2).await.unwrap();
        analyzed += more.analyzed;
        rounds += 1;
        if more.pending == 0 {
            break;
        }
        assert!(rounds < 10, "scan_more_pages never drained the run");
    }

    assert_eq!(analyzed, paths.len());

    let mut hits: HashMap<String, usize> = HashMap::new();
    for p in log.paths() {
        *hits.entry(p).or_insert(0) += 1;
    }
    for p in paths {
        assert_eq!(hits.get(p), Some(&1), "{} fetched more or less than once", p);
    }

    // Nothing left to do
    let done = orchestrator.scan_more_pages(result.run_id, 2).await.unwrap();
    assert_eq!((done.analyzed, done.failed, done.pending), (0, 0, 0));
}

#[tokio::test]
async fn test_concurrent_scans_never_share_a_page() {
    let server = MockServer::start().await;
    let paths = ["/a", "/b", "/c", "/d", "/e", "/f"];
    mount_sitemap(&server, &paths).await;
    mount_no_robots(&server).await;
    let log = PageLog::default();
    Mock::given(method("GET"))
        .respond_with(log.clone())
        .mount(&server)
        .await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(0))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        orchestrator.scan_more_pages(result.run_id, 4),
        orchestrator.scan_more_pages(result.run_id, 4)
    );
    let total = first.unwrap().analyzed + second.unwrap().analyzed;

    assert_eq!(total, paths.len());
    let mut fetched = log.paths();
    fetched.sort();
    fetched.dedup();
    assert_eq!(fetched.len(), paths.len());
    assert_eq!(log.paths().len(), paths.len());
}

#[tokio::test]
async fn test_crawl_delay_spacing() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/a", "/b", "/c", "/d"]).await;
    mount_no_robots(&server).await;
    let log = PageLog::default();
    Mock::given(method("GET"))
        .respond_with(log.clone())
        .mount(&server)
        .await;

    let delay = Duration::from_millis(150);
    let config = AuditConfig {
        crawl_delay: delay,
        ..test_config()
    };
    let orchestrator = orchestrator_with(
        config,
        shared(MemoryStore::new()),
        Arc::new(RuleBasedAnalyzer::new()),
    );

    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(4))
        .await
        .unwrap();
    assert_eq!(result.analyzed, 4);

    let instants = log.instants();
    assert_eq!(instants.len(), 4);
    for pair in instants.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        // Requests leave the client at least `delay` apart; allow for arrival jitter
        assert!(
            gap + Duration::from_millis(10) >= delay,
            "requests only {:?} apart",
            gap
        );
    }
}

#[tokio::test]
async fn test_discovery_failure_creates_no_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = shared(SqliteStore::new(&dir.path().join("audit.db")).unwrap());
    let orchestrator = orchestrator(store.clone());

    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()))
        .await;
    assert!(matches!(result, Err(AuditError::DiscoveryFailed { .. })));

    let status = orchestrator.run_status(1).unwrap();
    assert_eq!(status.counts.total(), 0);
    assert_eq!(status.run.phase, RunPhase::Idle);
    assert!(status.run.last_error.is_some());
}

#[tokio::test]
async fn test_robots_disallow_filtering() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow: /private\nSitemap: {}/pages.xml\n",
            base
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pages.xml"))
        .respond_with(xml(urlset(&[
            format!("{}/public", base),
            format!("{}/private/report", base),
            format!("{}/private", base),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/report"))
        .respond_with(html())
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let result = orchestrator(store.clone())
        .run_audit(AuditRequest::new("p", base.clone()).max_pages_to_analyze(5))
        .await
        .unwrap();

    assert_eq!(result.discovered, 1);
    assert_eq!(result.analyzed, 1);
    let pages = lock_store(&store)
        .unwrap()
        .list_pages(result.run_id, None, None)
        .unwrap();
    assert_eq!(pages[0].url, format!("{}/public", base));
}

#[tokio::test]
async fn test_analyzer_failure_keeps_link_and_asset_data() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/home"]).await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let store = shared(SqliteStore::new(&dir.path().join("audit.db")).unwrap());
    let orchestrator = orchestrator_with(test_config(), store.clone(), Arc::new(FailingAnalyzer));

    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()))
        .await
        .unwrap();
    assert_eq!(result.failed, 1);

    let store = lock_store(&store).unwrap();
    let page = &store.list_pages(result.run_id, None, None).unwrap()[0];
    assert_eq!(page.status, PageStatus::Failed);
    assert_eq!(page.fetch_status, FetchStatus::Fetched);
    assert_eq!(page.analysis_status, AnalysisStatus::AnalysisFailed);
    assert!(page.last_error.as_deref().unwrap().contains("score missing"));

    let links = store.list_link_audits(page.id).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links.iter().filter(|l| l.is_internal).count(), 1);
    let assets = store.list_asset_audits(page.id).unwrap();
    assert_eq!(assets.len(), 2);
    assert!(store.get_performance_audit(page.id).unwrap().is_some());
    assert!(store.get_page_analysis(page.id).unwrap().is_none());
}

#[tokio::test]
async fn test_retry_failed_pages() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/flaky", "/ok"]).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(2))
        .await
        .unwrap();
    assert_eq!((result.analyzed, result.failed), (1, 1));

    // Failed pages are not picked up without an explicit retry
    let idle = orchestrator.scan_more_pages(result.run_id, 5).await.unwrap();
    assert_eq!(idle.analyzed, 0);

    assert_eq!(orchestrator.retry_failed_pages(result.run_id).unwrap(), 1);
    let retried = orchestrator.scan_more_pages(result.run_id, 5).await.unwrap();
    assert_eq!((retried.analyzed, retried.failed, retried.pending), (1, 0, 0));
}

#[tokio::test]
async fn test_analyze_stored_page_replaces_analysis() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/only"]).await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()))
        .await
        .unwrap();
    let page_id = lock_store(&store)
        .unwrap()
        .list_pages(result.run_id, None, None)
        .unwrap()[0]
        .id;

    let again = orchestrator.analyze_stored_page(page_id).await.unwrap();
    assert_eq!(again.status, PageStatus::Analyzed);
    assert!(again.score.is_some());

    let store = lock_store(&store).unwrap();
    assert_eq!(store.list_analyses(result.run_id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_reanalysis_drops_previous_results() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/a"]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = shared(SqliteStore::new(&dir.path().join("audit.db")).unwrap());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()))
        .await
        .unwrap();
    assert_eq!(result.analyzed, 1);
    let page_id = lock_store(&store)
        .unwrap()
        .list_pages(result.run_id, None, None)
        .unwrap()[0]
        .id;

    let again = orchestrator.analyze_stored_page(page_id).await.unwrap();
    assert_eq!(again.status, PageStatus::Failed);

    let store = lock_store(&store).unwrap();
    assert!(store.get_page_analysis(page_id).unwrap().is_none());
    assert!(store.list_link_audits(page_id).unwrap().is_empty());
    assert!(store.list_asset_audits(page_id).unwrap().is_empty());

    let report = build_run_report(&*store, result.run_id).unwrap();
    assert_eq!(report.counts.analyzed, 0);
    assert_eq!(report.average_score, None);
    assert!(report.worst_pages.is_empty());
    assert_eq!(report.failed_pages.len(), 1);
}

#[tokio::test]
async fn test_run_stays_analyzing_while_another_batch_is_in_flight() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/x", "/y", "/z"]).await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(0))
        .await
        .unwrap();

    // Another worker holds the first page
    let held = lock_store(&store)
        .unwrap()
        .claim_pending_pages(result.run_id, 1)
        .unwrap();
    assert_eq!(held.len(), 1);

    let more = orchestrator.scan_more_pages(result.run_id, 5).await.unwrap();
    assert_eq!((more.analyzed, more.pending), (2, 0));

    let status = orchestrator.run_status(result.run_id).unwrap();
    assert_eq!(status.run.phase, RunPhase::Analyzing);
    assert_eq!(status.counts.analyzing, 1);

    orchestrator.recover_interrupted_pages(result.run_id).unwrap();
    assert_eq!(
        orchestrator.run_status(result.run_id).unwrap().run.phase,
        RunPhase::Idle
    );
}

#[tokio::test]
async fn test_huge_robots_crawl_delay_is_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1e30\n"))
        .mount(&server)
        .await;
    mount_sitemap(&server, &["/a", "/b"]).await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let config = AuditConfig {
        max_crawl_delay: Duration::from_millis(50),
        ..test_config()
    };
    let orchestrator = orchestrator_with(
        config,
        shared(MemoryStore::new()),
        Arc::new(RuleBasedAnalyzer::new()),
    );

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run_audit(AuditRequest::new("p", server.uri())),
    )
    .await
    .expect("capped crawl delay should not stall the audit")
    .unwrap();
    assert_eq!((result.analyzed, result.failed), (2, 0));
}

#[tokio::test]
async fn test_recover_interrupted_pages() {
    let server = MockServer::start().await;
    mount_sitemap(&server, &["/x", "/y"]).await;
    Mock::given(method("GET")).respond_with(html()).mount(&server).await;

    let store = shared(MemoryStore::new());
    let orchestrator = orchestrator(store.clone());
    let result = orchestrator
        .run_audit(AuditRequest::new("p", server.uri()).max_pages_to_analyze(0))
        .await
        .unwrap();

    // Simulate a process that claimed pages and died
    let claimed = lock_store(&store)
        .unwrap()
        .claim_pending_pages(result.run_id, 2)
        .unwrap();
    assert_eq!(claimed.len(), 2);
    assert!(matches!(
        orchestrator.analyze_stored_page(claimed[0].id).await,
        Err(AuditError::PageBusy(_))
    ));

    assert_eq!(orchestrator.recover_interrupted_pages(result.run_id).unwrap(), 2);
    let more = orchestrator.scan_more_pages(result.run_id, 5).await.unwrap();
    assert_eq!((more.analyzed, more.pending), (2, 0));
}
