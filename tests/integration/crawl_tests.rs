//! Integration tests for the crawler
//!
//! These tests drive the full scheduler (frontier, worker pool, retry pass)
//! through an in-memory renderer that serves scripted pages, so no browser is
//! needed.

use async_trait::async_trait;
use spa_crawler::config::load_url_list;
use spa_crawler::crawler::{Coordinator, CrawlReport};
use spa_crawler::extract::HeuristicExtractor;
use spa_crawler::render::{FrameDocument, RenderError, RenderSession, Renderer};
use spa_crawler::{CrawlConfig, CrawlError, WaitUntil};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake site answers a navigation
#[derive(Debug, Clone)]
enum Behavior {
    /// Renders `html` with the given status and title
    Page {
        status: u16,
        title: &'static str,
        html: String,
    },

    /// Every navigation exceeds its budget
    Timeout,

    /// The first `n` navigations exceed their budget, later ones render `html`
    TimeoutTimes { n: usize, html: String },

    /// Navigation fails with a non-timeout error
    Broken,

    /// Each read of the rendered HTML returns the next stage, the last one repeating
    Growing { stages: Vec<String> },
}

/// Scripted site shared by every session
#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, Behavior>,
    attempts: Mutex<HashMap<String, Vec<Duration>>>,
    html_reads: Mutex<HashMap<String, Vec<usize>>>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
}

impl FakeSite {
    fn with(mut self, url: &str, behavior: Behavior) -> Self {
        self.pages.insert(url.to_string(), behavior);
        self
    }

    fn page(self, url: &str, links: &[&str]) -> Self {
        self.with(
            url,
            Behavior::Page {
                status: 200,
                title: "Page",
                html: html_with_links(url, links),
            },
        )
    }

    fn budgets(&self, url: &str) -> Vec<Duration> {
        self.attempts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Rendered-HTML reads per completed navigation of `url`
    fn html_reads(&self, url: &str) -> Vec<usize> {
        self.html_reads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    fn attempted(&self, url: &str) -> bool {
        self.attempts.lock().unwrap().contains_key(url)
    }
}

fn html_with_links(url: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">link</a>"#, l))
        .collect();
    format!(
        "<html><head><title>Page</title></head><body><p>Content of {}</p>{}</body></html>",
        url, anchors
    )
}

struct FakeRenderer {
    site: Arc<FakeSite>,
}

struct FakeSession {
    site: Arc<FakeSite>,
    current: Option<(String, Behavior)>,
    html_reads: usize,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        self.site.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.site.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            current: None,
            html_reads: 0,
        }))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(
        &mut self,
        url: &str,
        budget: Duration,
        _until: WaitUntil,
    ) -> Result<Option<u16>, RenderError> {
        let attempt = {
            let mut attempts = self.site.attempts.lock().unwrap();
            let budgets = attempts.entry(url.to_string()).or_default();
            budgets.push(budget);
            budgets.len()
        };

        // Yield so that workers interleave
        tokio::time::sleep(Duration::from_millis(2)).await;

        let behavior = self.site.pages.get(url).cloned().unwrap_or(Behavior::Page {
            status: 404,
            title: "Not Found",
            html: "<html><body>Not found</body></html>".to_string(),
        });

        let status = match &behavior {
            Behavior::Page { status, .. } => *status,
            Behavior::Timeout => return Err(RenderError::timeout("navigation", budget)),
            Behavior::TimeoutTimes { n, .. } if attempt <= *n => {
                return Err(RenderError::timeout("navigation", budget))
            }
            Behavior::TimeoutTimes { .. } | Behavior::Growing { .. } => 200,
            Behavior::Broken => {
                return Err(RenderError::Navigation("net::ERR_CONNECTION_RESET".into()))
            }
        };

        self.current = Some((url.to_string(), behavior));
        Ok(Some(status))
    }

    async fn wait_for_selector(&mut self, _: &str, _: Duration) -> Result<(), RenderError> {
        Ok(())
    }

    async fn wait_for_function(&mut self, _: &str, _: Duration) -> Result<(), RenderError> {
        Ok(())
    }

    async fn evaluate(&mut self, _: &str) -> Result<serde_json::Value, RenderError> {
        Ok(serde_json::Value::Null)
    }

    async fn title(&mut self) -> Result<Option<String>, RenderError> {
        Ok(match &self.current {
            Some((_, Behavior::Page { title, .. })) => Some(title.to_string()),
            Some(_) => Some("Recovered".to_string()),
            None => None,
        })
    }

    async fn current_url(&mut self) -> Result<Option<String>, RenderError> {
        Ok(self.current.as_ref().map(|(url, _)| url.clone()))
    }

    async fn rendered_html(&mut self) -> Result<String, RenderError> {
        self.html_reads += 1;
        Ok(match &self.current {
            Some((_, Behavior::Page { html, .. })) => html.clone(),
            Some((_, Behavior::TimeoutTimes { html, .. })) => html.clone(),
            Some((_, Behavior::Growing { stages })) => {
                let stage = (self.html_reads - 1).min(stages.len() - 1);
                stages[stage].clone()
            }
            _ => String::new(),
        })
    }

    async fn frames(&mut self) -> Result<Vec<FrameDocument>, RenderError> {
        Ok(Vec::new())
    }

    async fn screenshot(&mut self, _: &Path) -> Result<(), RenderError> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        if let Some((url, _)) = &self.current {
            self.site
                .html_reads
                .lock()
                .unwrap()
                .entry(url.clone())
                .or_default()
                .push(self.html_reads);
        }
        self.site.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Creates a fast test configuration
fn create_test_config() -> CrawlConfig {
    CrawlConfig {
        concurrency: 3,
        max_pages: 100,
        timeout_ms: 1_000,
        poll_timeout_ms: 20,
        hydration_delay_ms: 0,
        content_wait_ms: 0,
        lazy_settle_ms: 0,
        ..CrawlConfig::default()
    }
}

async fn run_crawl(site: &Arc<FakeSite>, config: CrawlConfig, seeds: &[&str]) -> CrawlReport {
    let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
    let extractor = Arc::new(HeuristicExtractor::new(config.max_text_chars));
    let renderer = Arc::new(FakeRenderer {
        site: Arc::clone(site),
    });

    let coordinator =
        Coordinator::new(config, &seeds, renderer, extractor).expect("valid crawl setup");
    tokio::time::timeout(Duration::from_secs(10), coordinator.run())
        .await
        .expect("crawl finished in time")
}

fn result_urls(report: &CrawlReport) -> HashSet<String> {
    report
        .results
        .iter()
        .map(|r| r.url.as_str().to_string())
        .collect()
}

fn assert_no_duplicates(report: &CrawlReport) {
    let urls = result_urls(report);
    assert_eq!(urls.len(), report.results.len(), "duplicate result URLs");
}

#[tokio::test]
async fn test_same_origin_crawl_skips_cross_origin_links() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/x", "https://other.test/"])
            .page("https://a.test/x", &[])
            .page("https://other.test/", &[]),
    );
    let config = CrawlConfig {
        max_pages: 3,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(
        result_urls(&report),
        HashSet::from(["https://a.test/".to_string(), "https://a.test/x".to_string()])
    );
    assert!(!site.attempted("https://other.test/"));
}

#[tokio::test]
async fn test_single_page_budget_stops_discovery() {
    let site = Arc::new(FakeSite::default().page(
        "https://a.test/",
        &["/1", "/2", "/3", "/4", "/5"],
    ));
    let config = CrawlConfig {
        max_pages: 1,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].url.as_str(), "https://a.test/");
    assert_eq!(site.attempts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_persistent_timeout_retried_exactly_once() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/slow"])
            .with("https://a.test/slow", Behavior::Timeout),
    );

    let report = run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    // Primary attempt with the configured budget, one retry with double
    assert_eq!(
        site.budgets("https://a.test/slow"),
        vec![Duration::from_millis(1_000), Duration::from_millis(2_000)]
    );

    assert_eq!(
        result_urls(&report),
        HashSet::from(["https://a.test/".to_string()])
    );
    let retried: Vec<_> = report.retried.iter().map(|u| u.as_str()).collect();
    assert_eq!(retried, vec!["https://a.test/slow"]);
    let failed: Vec<_> = report.failed_after_retry.iter().map(|u| u.as_str()).collect();
    assert_eq!(failed, vec!["https://a.test/slow"]);
}

#[tokio::test]
async fn test_timeout_recovered_by_retry_pass() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/flaky"])
            .with(
                "https://a.test/flaky",
                Behavior::TimeoutTimes {
                    n: 1,
                    html: html_with_links("https://a.test/flaky", &["/after"]),
                },
            )
            .page("https://a.test/after", &[]),
    );

    let report = run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    assert_no_duplicates(&report);
    let flaky = report
        .results
        .iter()
        .find(|r| r.url.as_str() == "https://a.test/flaky")
        .expect("flaky page recorded after retry");
    assert_eq!(flaky.depth, 1);
    assert_eq!(flaky.status, Some(200));

    // Links found during the retry pass are still followed
    assert!(result_urls(&report).contains("https://a.test/after"));
    assert!(report.failed_after_retry.is_empty());
    assert_eq!(report.retried.len(), 1);
}

#[tokio::test]
async fn test_timeout_on_page_found_during_retry_is_recorded() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/flaky"])
            .with(
                "https://a.test/flaky",
                Behavior::TimeoutTimes {
                    n: 1,
                    html: html_with_links("https://a.test/flaky", &["/late"]),
                },
            )
            .with("https://a.test/late", Behavior::Timeout),
    );

    let report = run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    // First seen in the retry pass, so its single attempt is final
    assert_eq!(
        site.budgets("https://a.test/late"),
        vec![Duration::from_millis(2_000)]
    );
    let late = report
        .results
        .iter()
        .find(|r| r.url.as_str() == "https://a.test/late")
        .expect("late page recorded as failed");
    assert!(late.status.is_none());
    assert!(late.text.is_none());

    let retried: Vec<_> = report.retried.iter().map(|u| u.as_str()).collect();
    assert_eq!(retried, vec!["https://a.test/flaky"]);
    assert!(report.failed_after_retry.is_empty());
    assert_no_duplicates(&report);
}

#[tokio::test(start_paused = true)]
async fn test_text_growth_keeps_longest_snapshot() {
    let doc = |body: &str| format!("<html><body><p>{}</p></body></html>", body);
    let full = doc("Loading finished with the full article text");
    let site = Arc::new(FakeSite::default().with(
        "https://a.test/",
        Behavior::Growing {
            stages: vec![doc("Loading"), full.clone(), doc("Gone")],
        },
    ));
    let config = CrawlConfig {
        wait_text_growth_ms: 600,
        include_html: true,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    let result = &report.results[0];
    assert_eq!(
        result.text.as_deref(),
        Some("Loading finished with the full article text")
    );
    // The stored HTML is the snapshot the kept text came from
    assert_eq!(result.raw_html.as_deref(), Some(full.as_str()));
    assert!(site.html_reads("https://a.test/")[0] > 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_pass_doubles_text_growth_budget() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/flaky"])
            .with(
                "https://a.test/flaky",
                Behavior::TimeoutTimes {
                    n: 1,
                    html: html_with_links("https://a.test/flaky", &[]),
                },
            ),
    );
    let config = CrawlConfig {
        wait_text_growth_ms: 1_000,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;
    assert_eq!(report.results.len(), 2);

    // One initial read plus a sample every 200ms of the growth budget
    let primary = site.html_reads("https://a.test/");
    let retry = site.html_reads("https://a.test/flaky");
    assert_eq!(primary.len(), 1);
    assert_eq!(retry.len(), 1);
    assert!((5..=7).contains(&primary[0]), "primary reads: {:?}", primary);
    assert!((10..=12).contains(&retry[0]), "retry reads: {:?}", retry);
}

#[tokio::test]
async fn test_timeout_without_retry_records_placeholder() {
    let site = Arc::new(FakeSite::default().with("https://a.test/", Behavior::Timeout));
    let config = CrawlConfig {
        retry_failed: false,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    assert_eq!(site.budgets("https://a.test/").len(), 1);
    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert!(result.status.is_none());
    assert!(result.title.is_none());
    assert!(result.text.is_none());
    assert!(report.retried.is_empty());
}

#[tokio::test]
async fn test_non_timeout_error_is_not_retried() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/broken"])
            .with("https://a.test/broken", Behavior::Broken),
    );

    let report = run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    assert_eq!(site.budgets("https://a.test/broken").len(), 1);
    let broken = report
        .results
        .iter()
        .find(|r| r.url.as_str() == "https://a.test/broken")
        .expect("broken page recorded");
    assert!(broken.status.is_none());
    assert!(report.retried.is_empty());
}

#[tokio::test]
async fn test_cyclic_links_visited_once() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/b?y=2&x=1", "/c#top", "/"])
            .page("https://a.test/b?x=1&y=2", &["/", "/c", "https://A.TEST:443/b?x=1&y=2"])
            .page("https://a.test/c", &["/", "/b?x=1&y=2"]),
    );

    let report = run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    assert_no_duplicates(&report);
    assert_eq!(
        result_urls(&report),
        HashSet::from([
            "https://a.test/".to_string(),
            "https://a.test/b?x=1&y=2".to_string(),
            "https://a.test/c".to_string(),
        ])
    );
    for budgets in site.attempts.lock().unwrap().values() {
        assert_eq!(budgets.len(), 1);
    }
}

#[tokio::test]
async fn test_budget_holds_under_concurrency() {
    // Every page links to ten fresh pages
    let mut site = FakeSite::default();
    for i in 0..50 {
        let url = if i == 0 {
            "https://a.test/".to_string()
        } else {
            format!("https://a.test/p{}", i)
        };
        let links: Vec<String> = (1..=10).map(|j| format!("/p{}", (i * 10 + j) % 50)).collect();
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        site = site.page(&url, &links);
    }
    let site = Arc::new(site);
    let config = CrawlConfig {
        concurrency: 8,
        max_pages: 7,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    assert_eq!(report.results.len(), 7);
    assert_no_duplicates(&report);
    assert!(site.attempts.lock().unwrap().len() <= 7);
}

#[tokio::test]
async fn test_no_discover_visits_only_seeds() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/1", &["/3"])
            .page("https://a.test/2", &["/4"]),
    );
    let config = CrawlConfig {
        discover_links: false,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/1", "https://a.test/2"]).await;

    assert_eq!(
        result_urls(&report),
        HashSet::from([
            "https://a.test/1".to_string(),
            "https://a.test/2".to_string()
        ])
    );
    assert!(report.results.iter().all(|r| r.depth == 0));
}

#[tokio::test]
async fn test_cross_origin_followed_when_unrestricted() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["https://other.test/"])
            .page("https://other.test/", &[]),
    );
    let config = CrawlConfig {
        same_origin: false,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    assert!(result_urls(&report).contains("https://other.test/"));
}

#[tokio::test]
async fn test_depth_follows_link_distance() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/one"])
            .page("https://a.test/one", &["/two"])
            .page("https://a.test/two", &[]),
    );

    let report = run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    let depths: HashMap<_, _> = report
        .results
        .iter()
        .map(|r| (r.url.as_str().to_string(), r.depth))
        .collect();
    assert_eq!(depths["https://a.test/"], 0);
    assert_eq!(depths["https://a.test/one"], 1);
    assert_eq!(depths["https://a.test/two"], 2);
}

#[tokio::test]
async fn test_every_session_is_closed() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/", &["/ok", "/slow", "/broken"])
            .page("https://a.test/ok", &[])
            .with("https://a.test/slow", Behavior::Timeout)
            .with("https://a.test/broken", Behavior::Broken),
    );

    run_crawl(&site, create_test_config(), &["https://a.test/"]).await;

    // One session per attempt: 4 primary visits plus one retry
    assert_eq!(site.sessions_opened.load(Ordering::SeqCst), 5);
    assert_eq!(site.open_sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scraped_fields() {
    let site = Arc::new(FakeSite::default().page("https://a.test/", &[]));
    let config = CrawlConfig {
        include_html: true,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    let result = &report.results[0];
    assert_eq!(result.status, Some(200));
    assert_eq!(result.title.as_deref(), Some("Page"));
    assert_eq!(result.text.as_deref(), Some("Content of https://a.test/"));
    assert!(result
        .raw_html
        .as_deref()
        .is_some_and(|h| h.contains("<title>Page</title>")));
}

#[tokio::test]
async fn test_scrape_disabled_leaves_content_empty() {
    let site = Arc::new(FakeSite::default().page("https://a.test/", &["/next"]));
    let config = CrawlConfig {
        scrape: false,
        include_html: true,
        ..create_test_config()
    };

    let report = run_crawl(&site, config, &["https://a.test/"]).await;

    let home = report
        .results
        .iter()
        .find(|r| r.url.as_str() == "https://a.test/")
        .unwrap();
    assert_eq!(home.status, Some(200));
    assert!(home.title.is_none());
    assert!(home.text.is_none());
    assert!(home.raw_html.is_none());

    // Discovery still works without scraping
    assert!(result_urls(&report).contains("https://a.test/next"));
}

#[tokio::test]
async fn test_seeds_from_url_list_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let body = br#"{"pages":[{"url":"https://a.test/1"},"https://a.test/2","https://a.test/1"]}"#;
    file.write_all(body).unwrap();

    let seeds = load_url_list(file.path()).unwrap();
    assert_eq!(seeds, vec!["https://a.test/1", "https://a.test/2"]);

    let site = Arc::new(
        FakeSite::default()
            .page("https://a.test/1", &[])
            .page("https://a.test/2", &[]),
    );
    let seed_refs: Vec<&str> = seeds.iter().map(String::as_str).collect();
    let report = run_crawl(&site, create_test_config(), &seed_refs).await;

    assert_eq!(report.results.len(), 2);
}

#[tokio::test]
async fn test_invalid_seeds_rejected() {
    let site = Arc::new(FakeSite::default());
    let result = Coordinator::new(
        create_test_config(),
        &["mailto:someone@a.test".to_string(), "   ".to_string()],
        Arc::new(FakeRenderer { site }),
        Arc::new(HeuristicExtractor::new(100)),
    );

    assert!(matches!(result, Err(CrawlError::NoSeeds)));
}
