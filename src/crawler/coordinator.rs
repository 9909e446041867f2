//! Crawler coordinator - pass orchestration and the retry protocol
//!
//! This module contains the top-level crawl logic:
//! - Canonicalizing seeds and fixing the origin policy
//! - Running a pass: spawning the worker pool and waiting on the join barrier
//! - Moving through the primary and retry phases
//! - Producing the final report

use super::results::{CrawlReport, ResultAggregator};
use super::scheduler::{CrawlTask, Scheduler};
use super::visit::VisitSettings;
use super::worker::{run_worker, WorkerContext};
use crate::config::{validate, CrawlConfig};
use crate::extract::{Extractor, HeuristicExtractor};
use crate::render::{ChromeOptions, ChromeRenderer, Renderer};
use crate::state::CrawlPhase;
use crate::url::{canonicalize, CanonicalUrl, OriginPolicy};
use crate::CrawlError;
use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: CrawlConfig,
    seeds: Vec<CanonicalUrl>,
    scheduler: Arc<Scheduler>,
    results: Arc<ResultAggregator>,
    renderer: Arc<dyn Renderer>,
    extractor: Arc<dyn Extractor>,
    policy: OriginPolicy,
    settings: VisitSettings,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `seeds` - Raw start URLs; invalid ones are skipped with a warning
    /// * `renderer` - Browser engine handle shared by all workers
    /// * `extractor` - Link/text heuristics
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - Invalid configuration or no usable seed
    pub fn new(
        config: CrawlConfig,
        seeds: &[String],
        renderer: Arc<dyn Renderer>,
        extractor: Arc<dyn Extractor>,
    ) -> crate::Result<Self> {
        validate(&config)?;
        let seeds = canonical_seeds(seeds)?;
        Ok(Self::with_seeds(config, seeds, renderer, extractor))
    }

    /// Builds a coordinator from already canonicalized, non-empty seeds
    fn with_seeds(
        config: CrawlConfig,
        seeds: Vec<CanonicalUrl>,
        renderer: Arc<dyn Renderer>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        // The first seed fixes the origin for the whole crawl
        let policy = OriginPolicy::new(seeds.first(), config.same_origin);
        let settings = VisitSettings::from_config(&config);
        let scheduler = Arc::new(Scheduler::new(config.max_pages));

        Self {
            config,
            seeds,
            scheduler,
            results: Arc::new(ResultAggregator::new()),
            renderer,
            extractor,
            policy,
            settings,
        }
    }

    /// Runs the crawl to completion
    ///
    /// This method:
    /// 1. Seeds the frontier at depth 0
    /// 2. Runs the primary pass until its join barrier completes
    /// 3. If retry is enabled and timeouts were recorded, releases those URLs,
    ///    re-seeds them at their original depth and runs one retry pass with
    ///    doubled budgets
    /// 4. Reports retried URLs that still timed out; any other timeout in the
    ///    retry pass is recorded as a failed visit
    pub async fn run(self) -> CrawlReport {
        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl of {} seed(s) with {} workers, budget {} pages",
            self.seeds.len(),
            self.config.concurrency,
            self.config.max_pages
        );

        for seed in &self.seeds {
            self.scheduler.seed(CrawlTask::new(seed.clone(), 0));
        }

        let mut phase = CrawlPhase::Primary;
        let mut retried: Vec<CanonicalUrl> = Vec::new();

        while phase.runs_pass() {
            let (settings, retrying) = match phase {
                CrawlPhase::Retry => (
                    self.settings.doubled(),
                    Some(retried.iter().cloned().collect()),
                ),
                _ => (self.settings.clone(), None),
            };
            self.run_pass(phase, settings, retrying).await;

            let next = phase.next(
                self.config.retry_failed,
                self.scheduler.has_failed_timeouts(),
            );

            if next == CrawlPhase::Retry {
                let failed = self.scheduler.take_failed_timeouts();
                tracing::info!(
                    "Retrying {} timed-out URL(s) with doubled timeout",
                    failed.len()
                );

                self.scheduler.release(&failed);
                for task in failed {
                    retried.push(task.url.clone());
                    self.scheduler.seed(task);
                }
            }

            phase = next;
        }

        let failed_after_retry: Vec<CanonicalUrl> = self
            .scheduler
            .take_failed_timeouts()
            .into_iter()
            .map(|task| task.url)
            .collect();

        let Self {
            results, scheduler, ..
        } = self;
        let results = Arc::try_unwrap(results)
            .map(ResultAggregator::into_results)
            .unwrap_or_else(|shared| shared.snapshot());

        tracing::info!(
            "Crawl completed: {} results, {} URLs claimed in {:?}",
            results.len(),
            scheduler.visited_count(),
            start_time.elapsed()
        );

        CrawlReport {
            results,
            retried,
            failed_after_retry,
        }
    }

    /// Runs one pass over the current frontier
    ///
    /// The pass ends when the scheduler reports no queued or in-flight task,
    /// or when every worker has exited. Remaining idle workers are cancelled.
    async fn run_pass(
        &self,
        phase: CrawlPhase,
        settings: VisitSettings,
        retrying: Option<HashSet<CanonicalUrl>>,
    ) {
        let pass_start = Instant::now();
        let before = self.results.len();
        tracing::info!(
            "Starting {} ({} queued, timeout {:?})",
            phase,
            self.scheduler.queue_len(),
            settings.timeout
        );

        let ctx = Arc::new(WorkerContext {
            scheduler: Arc::clone(&self.scheduler),
            renderer: Arc::clone(&self.renderer),
            extractor: Arc::clone(&self.extractor),
            results: Arc::clone(&self.results),
            settings,
            policy: self.policy.clone(),
            retry_timeouts: self.config.retry_failed,
            retrying,
            poll: Duration::from_millis(self.config.poll_timeout_ms),
            completed: AtomicUsize::new(0),
            started: pass_start,
        });

        let mut workers = JoinSet::new();
        for id in 0..self.config.concurrency {
            workers.spawn(run_worker(id, Arc::clone(&ctx)));
        }

        let scheduler = Arc::clone(&self.scheduler);
        tokio::select! {
            _ = scheduler.join() => {}
            _ = async {
                while let Some(joined) = workers.join_next().await {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            // The panicked worker's claimed task will never be marked done
                            tracing::error!("Worker panicked: {}", e);
                            scheduler.task_done();
                        }
                    }
                }
            } => {}
        }

        workers.abort_all();
        while workers.join_next().await.is_some() {}

        tracing::info!(
            "Finished {}: {} new results in {:?}",
            phase,
            self.results.len() - before,
            pass_start.elapsed()
        );
    }
}

/// Crawls with a freshly launched Chromium instance
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `seeds` - Raw start URLs; the first valid one fixes the origin
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Results plus the URLs that failed after retry
/// * `Err(CrawlError)` - Invalid configuration, no seeds, or browser launch failure
///
/// # Example
///
/// ```no_run
/// use spa_crawler::{crawl, CrawlConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = crawl(CrawlConfig::default(), &["https://example.com/".to_string()]).await?;
/// println!("{} pages", report.results.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: CrawlConfig, seeds: &[String]) -> Result<CrawlReport, CrawlError> {
    validate(&config)?;

    // No browser is started for a crawl that has nothing to visit
    let seeds = canonical_seeds(seeds)?;

    let renderer = Arc::new(ChromeRenderer::launch(ChromeOptions::from_config(&config)).await?);
    let extractor = Arc::new(HeuristicExtractor::new(config.max_text_chars));

    let report = Coordinator::with_seeds(config, seeds, renderer.clone(), extractor)
        .run()
        .await;

    match Arc::try_unwrap(renderer) {
        Ok(renderer) => renderer.shutdown().await,
        Err(_) => tracing::warn!("Renderer still in use after crawl, skipping shutdown"),
    }

    Ok(report)
}

/// Canonicalizes raw start URLs, skipping invalid ones with a warning
///
/// # Returns
///
/// * `Ok(Vec<CanonicalUrl>)` - At least one seed, in input order
/// * `Err(CrawlError::NoSeeds)` - No input survived canonicalization
fn canonical_seeds(seeds: &[String]) -> crate::Result<Vec<CanonicalUrl>> {
    let mut canonical = Vec::with_capacity(seeds.len());
    for raw in seeds {
        match canonicalize(raw) {
            Some(url) => canonical.push(url),
            None => tracing::warn!("Skipping invalid start URL: {}", raw),
        }
    }

    if canonical.is_empty() {
        return Err(CrawlError::NoSeeds);
    }
    Ok(canonical)
}
