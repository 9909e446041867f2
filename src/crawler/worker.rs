//! Worker loop
//!
//! Workers are symmetric: each pulls a task from the shared scheduler, visits
//! it, feeds discovered in-scope links back into the frontier and records the
//! outcome before asking for the next task.

use super::results::{ResultAggregator, VisitResult};
use super::scheduler::{Admission, CrawlTask, Scheduler};
use super::visit::{visit, VisitOutcome, VisitSettings};
use crate::extract::Extractor;
use crate::render::Renderer;
use crate::url::{CanonicalUrl, OriginPolicy};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a worker needs for one pass
pub struct WorkerContext {
    pub scheduler: Arc<Scheduler>,
    pub renderer: Arc<dyn Renderer>,
    pub extractor: Arc<dyn Extractor>,
    pub results: Arc<ResultAggregator>,
    pub settings: VisitSettings,
    pub policy: OriginPolicy,

    /// Timed-out visits are parked for the retry pass instead of recorded
    pub retry_timeouts: bool,

    /// URLs re-seeded for the retry pass; `None` during the primary pass
    ///
    /// In the retry pass only these may time out without a record. Any other
    /// URL has had no earlier attempt and cannot be retried any more.
    pub retrying: Option<HashSet<CanonicalUrl>>,

    /// Idle poll before a worker re-checks whether the pass has drained
    pub poll: Duration,

    /// Visits completed in this pass, shared by all workers
    pub completed: AtomicUsize,
    pub started: Instant,
}

impl WorkerContext {
    /// Returns true if a timeout on `url` is parked instead of recorded
    fn parks_timeout(&self, url: &CanonicalUrl) -> bool {
        match &self.retrying {
            Some(retrying) => retrying.contains(url),
            None => self.retry_timeouts,
        }
    }
}

/// Runs one worker until the pass drains
///
/// # Arguments
///
/// * `id` - Worker number, for logging
/// * `ctx` - Shared pass context
pub async fn run_worker(id: usize, ctx: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", id);

    while let Some(task) = ctx.scheduler.next_task(ctx.poll).await {
        tracing::debug!("Worker {} visiting {} (depth {})", id, task.url, task.depth);

        let outcome = visit(
            ctx.renderer.as_ref(),
            ctx.extractor.as_ref(),
            &ctx.settings,
            &task,
        )
        .await;

        match outcome {
            VisitOutcome::Success(page) => {
                admit_links(&ctx, &page.links, task.depth + 1);
                ctx.results.push(page.result);
            }
            VisitOutcome::Timeout(e) if ctx.parks_timeout(&task.url) => {
                tracing::warn!("Timed out visiting {}: {}", task.url, e);
                ctx.scheduler.record_timeout(task.clone());
            }
            VisitOutcome::Timeout(e) | VisitOutcome::Failed(e) => {
                tracing::warn!("Error visiting {}: {}", task.url, e);
                ctx.results.push(VisitResult::failed(task.url.clone(), task.depth));
            }
        }

        ctx.scheduler.task_done();
        report_progress(&ctx);
    }

    tracing::debug!("Worker {} found no more work, exiting", id);
}

/// Offers in-scope links to the frontier
fn admit_links(ctx: &WorkerContext, links: &[CanonicalUrl], depth: u32) {
    let mut accepted = 0;
    let mut out_of_scope = 0;
    let mut over_budget = 0;

    for link in links {
        if !ctx.policy.allows(link) {
            out_of_scope += 1;
            continue;
        }

        match ctx.scheduler.try_enqueue(CrawlTask::new(link.clone(), depth)) {
            Admission::Accepted => accepted += 1,
            Admission::Duplicate => {}
            Admission::BudgetExhausted => over_budget += 1,
        }
    }

    if !links.is_empty() {
        tracing::debug!(
            "Discovered {} links: {} queued, {} out of scope, {} over budget",
            links.len(),
            accepted,
            out_of_scope,
            over_budget
        );
    }
}

/// Logs a progress line every 10 completed visits
fn report_progress(ctx: &WorkerContext) {
    let completed = ctx.completed.fetch_add(1, Ordering::Relaxed) + 1;
    if completed % 10 == 0 {
        let elapsed = ctx.started.elapsed();
        let rate = completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "Progress: {} pages visited, {} in frontier, {} claimed of {}, {:.2} pages/sec",
            completed,
            ctx.scheduler.queue_len(),
            ctx.scheduler.visited_count(),
            ctx.scheduler.max_pages(),
            rate
        );
    }
}
