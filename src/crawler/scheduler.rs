//! Frontier and visit ledger shared by the worker pool
//!
//! This module handles:
//! - FIFO queue of (url, depth) tasks with admission control
//! - The visited set (claimed URLs) and the page budget
//! - Pass termination via a pending-task counter and join barrier
//! - Collection of timed-out tasks for the retry pass
//!
//! All mutable state sits behind one mutex so that every check-then-insert
//! sequence (admission, claim) is a single atomic step. The lock is never held
//! across an await point.

use crate::url::CanonicalUrl;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// A URL waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Canonical URL to visit
    pub url: CanonicalUrl,

    /// Link distance from the seed that led here
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: CanonicalUrl, depth: u32) -> Self {
        Self { url, depth }
    }
}

/// Outcome of offering a discovered link to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The task was queued
    Accepted,

    /// The URL is already claimed or already waiting in the queue
    Duplicate,

    /// Claimed plus queued URLs already fill the page budget
    BudgetExhausted,
}

#[derive(Debug, Default)]
struct FrontierState {
    /// Tasks waiting for a worker, in arrival order
    queue: VecDeque<CrawlTask>,

    /// URLs currently in `queue`
    queued: HashSet<CanonicalUrl>,

    /// URLs claimed by a worker
    visited: HashSet<CanonicalUrl>,

    /// Tasks queued or in flight that have not been marked done
    pending: usize,

    /// Tasks whose visit timed out during the current pass
    failed_timeouts: Vec<CrawlTask>,
}

/// Frontier plus visit ledger for one crawl
///
/// The scheduler outlives individual passes: the visited set carries over from
/// the primary pass into the retry pass, minus the URLs released for retry.
pub struct Scheduler {
    state: Mutex<FrontierState>,

    /// Signalled whenever a task is queued
    work: Notify,

    /// Signalled when the pending count drops to zero
    drained: Notify,

    max_pages: usize,
}

impl Scheduler {
    /// Creates an empty scheduler with the given page budget
    pub fn new(max_pages: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            work: Notify::new(),
            drained: Notify::new(),
            max_pages,
        }
    }

    /// Queues a seed task without the budget check
    ///
    /// Seeds are still subject to the claim-time budget check, so extra seeds
    /// beyond `max_pages` are discarded when dequeued.
    ///
    /// # Returns
    ///
    /// `false` if the URL was already queued or claimed
    pub fn seed(&self, task: CrawlTask) -> bool {
        let mut state = self.lock();
        if state.visited.contains(&task.url) || state.queued.contains(&task.url) {
            return false;
        }

        Self::push(&mut state, task);
        drop(state);

        self.work.notify_one();
        true
    }

    /// Offers a discovered link to the frontier
    ///
    /// The duplicate check, the budget check (`claimed + queued < max_pages`)
    /// and the insert happen under one lock, so concurrent workers can never
    /// jointly overshoot the budget.
    pub fn try_enqueue(&self, task: CrawlTask) -> Admission {
        let mut state = self.lock();

        if state.visited.contains(&task.url) || state.queued.contains(&task.url) {
            return Admission::Duplicate;
        }

        if state.visited.len() + state.queue.len() >= self.max_pages {
            return Admission::BudgetExhausted;
        }

        tracing::trace!("Queued {} at depth {}", task.url, task.depth);
        Self::push(&mut state, task);
        drop(state);

        self.work.notify_one();
        Admission::Accepted
    }

    /// Waits for the next task and claims it
    ///
    /// Tasks whose URL is already claimed, or that arrive once the budget is
    /// spent, are discarded (and marked done) without being returned.
    ///
    /// # Arguments
    ///
    /// * `poll` - How long to wait for new work before re-checking for drain
    ///
    /// # Returns
    ///
    /// * `Some(CrawlTask)` - A claimed task; the caller must call [`Self::task_done`]
    /// * `None` - The queue stayed empty for `poll` and no task is in flight
    pub async fn next_task(&self, poll: Duration) -> Option<CrawlTask> {
        loop {
            let notified = self.work.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = self.claim_next() {
                return Some(task);
            }

            if tokio::time::timeout(poll, notified).await.is_err() && self.pending() == 0 {
                return None;
            }
        }
    }

    /// Marks a claimed task as finished
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.pending = state.pending.saturating_sub(1);
        let drained = state.pending == 0;
        drop(state);

        if drained {
            self.drained.notify_waiters();
        }
    }

    /// Waits until every queued task has been processed or discarded
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Records a task whose visit timed out during the current pass
    pub fn record_timeout(&self, task: CrawlTask) {
        self.lock().failed_timeouts.push(task);
    }

    /// Drains the timed-out tasks recorded so far
    pub fn take_failed_timeouts(&self) -> Vec<CrawlTask> {
        std::mem::take(&mut self.lock().failed_timeouts)
    }

    /// Returns true if any task timed out during the current pass
    pub fn has_failed_timeouts(&self) -> bool {
        !self.lock().failed_timeouts.is_empty()
    }

    /// Removes URLs from the visited set so they can be claimed again
    pub fn release(&self, tasks: &[CrawlTask]) {
        let mut state = self.lock();
        for task in tasks {
            state.visited.remove(&task.url);
        }
    }

    /// Number of claimed URLs
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Returns true if the URL has been claimed
    pub fn is_visited(&self, url: &CanonicalUrl) -> bool {
        self.lock().visited.contains(url)
    }

    /// Number of tasks waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of tasks queued or in flight
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    /// The page budget
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn push(state: &mut FrontierState, task: CrawlTask) {
        state.queued.insert(task.url.clone());
        state.queue.push_back(task);
        state.pending += 1;
    }

    /// Pops tasks until one can be claimed
    fn claim_next(&self) -> Option<CrawlTask> {
        let mut state = self.lock();
        let mut drained = false;
        let mut claimed = None;

        while let Some(task) = state.queue.pop_front() {
            state.queued.remove(&task.url);

            if state.visited.contains(&task.url) || state.visited.len() >= self.max_pages {
                tracing::trace!("Discarding {} (claimed or over budget)", task.url);
                state.pending = state.pending.saturating_sub(1);
                drained = state.pending == 0;
                continue;
            }

            state.visited.insert(task.url.clone());
            claimed = Some(task);
            break;
        }
        drop(state);

        if drained {
            self.drained.notify_waiters();
        }
        claimed
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
