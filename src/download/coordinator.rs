//! Bounded-concurrency download pool with a target success count.
//!
//! Workers claim candidates one at a time from a shared cursor. The claim,
//! the stop check and the success commit all happen under the same lock, so:
//!
//! - no new candidate is claimed once `succeeded == target`
//! - a staged image is renamed into place only while `succeeded < target`,
//!   so the folder never holds more than `target` files
//! - reaching the target cancels every in-flight fetch; its I/O is dropped

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetcher::Fetch;
use super::progress::{ProgressState, ProgressTracker};
use super::storage::StagedImage;
use crate::models::{DownloadOutcome, FailureReason, ResultRecord};

type CandidateIter = Box<dyn Iterator<Item = ResultRecord> + Send>;

/// Claim cursor; `next_index` numbers candidates in claim order
struct Dispatch {
    candidates: CandidateIter,
    next_index: usize,
}

struct Shared<F> {
    fetcher: F,
    tracker: ProgressTracker,
    dispatch: Mutex<Dispatch>,
    target: usize,
    done: CancellationToken,
}

impl<F> Shared<F> {
    fn lock(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn target_met(&self) -> bool {
        self.tracker.succeeded() >= self.target
    }

    /// Reserve the next candidate, or `None` when the pool should wind down
    fn claim(&self) -> Option<(usize, ResultRecord)> {
        let mut dispatch = self.lock();
        if self.done.is_cancelled() || self.target_met() {
            return None;
        }

        let record = dispatch.candidates.next()?;
        let index = dispatch.next_index;
        dispatch.next_index += 1;
        Some((index, record))
    }

    /// Commit or discard a finished fetch and record it. Returns false once the target is met.
    fn settle(
        &self,
        worker: usize,
        index: usize,
        record: &ResultRecord,
        staged: Result<StagedImage, FailureReason>,
    ) -> bool {
        let _dispatch = self.lock();
        if self.target_met() {
            debug!(worker, index, "Target already met, discarding result");
            return false;
        }

        let outcome: DownloadOutcome = match staged {
            Ok(image) => image.commit().map_err(FailureReason::from).into(),
            Err(reason) => DownloadOutcome::Failure(reason),
        };
        match &outcome {
            DownloadOutcome::Success(path) => {
                debug!(worker, index, path = %path.display(), "Image saved")
            }
            DownloadOutcome::Failure(reason) => {
                debug!(worker, index, locator = record.locator(), error = %reason, "Download failed")
            }
        }

        let state = self.tracker.record(&outcome);
        if state.succeeded >= self.target {
            self.done.cancel();
            return false;
        }
        true
    }
}

/// Runs a fixed-size worker pool over the candidate sequence.
pub struct DownloadCoordinator<F: Fetch> {
    fetcher: F,
    tracker: ProgressTracker,
    cancel: CancellationToken,
}

impl<F: Fetch + 'static> DownloadCoordinator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            tracker: ProgressTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Record into a caller-provided tracker (e.g. one with a progress observer)
    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Cancelling this token stops dispatch and aborts in-flight fetches
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download until `target` successes or until the candidates run out.
    ///
    /// Returns the final counters once every worker has exited.
    pub async fn run<I>(self, candidates: I, target: usize, workers: NonZeroUsize) -> ProgressState
    where
        I: IntoIterator<Item = ResultRecord>,
        I::IntoIter: Send + 'static,
    {
        let shared = Arc::new(Shared {
            fetcher: self.fetcher,
            tracker: self.tracker,
            dispatch: Mutex::new(Dispatch {
                candidates: Box::new(candidates.into_iter()),
                next_index: 0,
            }),
            target,
            done: self.cancel.child_token(),
        });

        let mut join_set = JoinSet::new();
        for worker in 0..workers.get() {
            let shared = Arc::clone(&shared);
            join_set.spawn(async move { work(worker, shared).await });
        }

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Download worker aborted");
            }
        }

        let state = shared.tracker.snapshot();
        info!(
            attempted = state.attempted,
            succeeded = state.succeeded,
            failed = state.failed,
            target,
            "Download phase finished"
        );
        state
    }
}

async fn work<F: Fetch>(worker: usize, shared: Arc<Shared<F>>) {
    while let Some((index, record)) = shared.claim() {
        let staged = tokio::select! {
            biased;
            _ = shared.done.cancelled() => {
                debug!(worker, index, locator = record.locator(), "Fetch cancelled");
                break;
            }
            staged = shared.fetcher.stage(&record, index) => staged,
        };

        if !shared.settle(worker, index, &record, staged) {
            break;
        }
    }
}
