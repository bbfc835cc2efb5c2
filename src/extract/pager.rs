//! Pagination protocol over an infinite-scroll result feed.
//!
//! Each iteration requests more results, waits for the render to settle,
//! pokes the optional "show more" control, then re-parses the whole snapshot
//! and merges new locators into the [`CandidateQueue`]. The loop ends when
//! enough candidates are collected or when `stall_limit` consecutive
//! iterations added nothing.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::{parse_results, CandidateQueue, ControlProbe, ExtractionError, PageSource};

/// Pagination tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerSettings {
    /// Fixed wait after each "request more" before re-reading the markup
    pub settle_interval: Duration,

    /// Consecutive no-progress iterations before the feed is declared stalled
    pub stall_limit: u32,
}

impl Default for PagerSettings {
    fn default() -> Self {
        Self {
            settle_interval: Duration::from_secs(3),
            stall_limit: 3,
        }
    }
}

impl PagerSettings {
    pub fn settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    pub fn stall_limit(mut self, limit: u32) -> Self {
        self.stall_limit = limit;
        self
    }
}

/// Where the pager is in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Loaded,
    Parsing,
    ScrollRequested,
    AwaitingRender,
    Stalled,
    Terminated,
}

/// Why extraction stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerOutcome {
    /// At least `target_count` distinct candidates were collected
    TargetReached,
    /// The feed stopped producing new candidates
    Stalled,
}

/// Result of a completed extraction phase
#[derive(Debug)]
pub struct ExtractionReport {
    pub candidates: CandidateQueue,
    pub outcome: PagerOutcome,
    /// Number of "request more" round trips performed
    pub iterations: usize,
}

/// Drives a [`PageSource`] until the target is met or the feed stalls.
#[derive(Debug)]
pub struct FeedPager<P: PageSource> {
    source: P,
    settings: PagerSettings,
    state: PagerState,
}

impl<P: PageSource> FeedPager<P> {
    /// Wrap a page source whose first results page is already loaded
    pub fn new(source: P, settings: PagerSettings) -> Self {
        Self {
            source,
            settings,
            state: PagerState::Loaded,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    /// Run the protocol. The page source is disposed whatever the result.
    ///
    /// If this future is dropped before completion, call [`terminate`](Self::terminate).
    pub async fn run(&mut self, target_count: usize) -> Result<ExtractionReport, ExtractionError> {
        let result = self.drive(target_count).await;
        self.terminate().await;

        if let Ok(report) = &result {
            info!(
                candidates = report.candidates.len(),
                iterations = report.iterations,
                outcome = ?report.outcome,
                "Extraction finished"
            );
        }
        result
    }

    /// Dispose the page source and enter [`PagerState::Terminated`]. Idempotent.
    pub async fn terminate(&mut self) {
        if self.state == PagerState::Terminated {
            return;
        }
        if let Err(e) = self.source.dispose().await {
            warn!(error = %e, "Failed to dispose page source");
        }
        self.transition(PagerState::Terminated);
    }

    async fn drive(&mut self, target_count: usize) -> Result<ExtractionReport, ExtractionError> {
        let stall_limit = self.settings.stall_limit.max(1);
        let mut candidates = CandidateQueue::new();
        let mut iterations = 0;
        let mut idle = 0;

        self.harvest(&mut candidates).await?;

        let outcome = loop {
            if candidates.len() >= target_count {
                break PagerOutcome::TargetReached;
            }
            iterations += 1;

            self.transition(PagerState::ScrollRequested);
            self.source
                .request_more()
                .await
                .map_err(ExtractionError::at("request_more"))?;

            self.transition(PagerState::AwaitingRender);
            sleep(self.settings.settle_interval).await;

            match self
                .source
                .advance_control()
                .await
                .map_err(ExtractionError::at("advance_control"))?
            {
                ControlProbe::Activated => debug!("Activated show-more control"),
                ControlProbe::Absent => trace!("No show-more control on the page"),
            }

            let added = self.harvest(&mut candidates).await?;
            if added > 0 {
                idle = 0;
                continue;
            }

            idle += 1;
            debug!(idle, stall_limit, collected = candidates.len(), "No new candidates");
            if idle >= stall_limit {
                self.transition(PagerState::Stalled);
                break PagerOutcome::Stalled;
            }
        };

        Ok(ExtractionReport {
            candidates,
            outcome,
            iterations,
        })
    }

    /// Parse the current snapshot and merge it; returns the number of new candidates
    async fn harvest(&mut self, candidates: &mut CandidateQueue) -> Result<usize, ExtractionError> {
        self.transition(PagerState::Parsing);
        let markup = self
            .source
            .current_markup()
            .await
            .map_err(ExtractionError::at("current_markup"))?;

        let added = candidates.extend(parse_results(&markup));
        debug!(added, total = candidates.len(), "Parsed result feed");
        Ok(added)
    }

    fn transition(&mut self, next: PagerState) {
        trace!(from = ?self.state, to = ?next, "Pager transition");
        self.state = next;
    }
}
