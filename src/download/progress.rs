//! Download progress counters shared by all workers of one run.
//!
//! # Usage
//!
//! ```ignore
//! use image_extractor::download::ProgressTracker;
//!
//! let tracker = ProgressTracker::new()
//!     .with_observer(|state| println!("{}/{}", state.succeeded, state.attempted));
//! tracker.record(&outcome);
//! let state = tracker.snapshot();
//! ```

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::DownloadOutcome;

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

type Observer = Arc<dyn Fn(&ProgressState) + Send + Sync>;

#[derive(Debug)]
struct Counters {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    started_at: DateTime<Utc>,
    start_time: Instant,
}

/// Thread-safe attempt/success/failure counters with elapsed time.
///
/// Clones share the same counters.
#[derive(Clone)]
pub struct ProgressTracker {
    counters: Arc<Counters>,

    /// Called after every recorded attempt (from any worker)
    observer: Option<Observer>,
}

impl ProgressTracker {
    /// Start tracking now
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters {
                attempted: AtomicUsize::new(0),
                succeeded: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                started_at: Utc::now(),
                start_time: Instant::now(),
            }),
            observer: None,
        }
    }

    /// Set a callback for progress updates
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ProgressState) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Count one finished attempt; exactly one of succeeded/failed is incremented
    pub fn record(&self, outcome: &DownloadOutcome) -> ProgressState {
        let bucket = if outcome.is_success() {
            &self.counters.succeeded
        } else {
            &self.counters.failed
        };
        bucket.fetch_add(1, Ordering::SeqCst);
        self.counters.attempted.fetch_add(1, Ordering::SeqCst);

        let state = self.snapshot();
        if let Some(observer) = &self.observer {
            observer(&state);
        }
        state
    }

    /// Read the counters. Each field is read atomically on its own.
    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            attempted: self.counters.attempted.load(Ordering::SeqCst),
            succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            started_at: self.counters.started_at,
            elapsed: self.counters.start_time.elapsed(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.counters.succeeded.load(Ordering::SeqCst)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("counters", &self.counters)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "Fn(&ProgressState)"),
            )
            .finish()
    }
}
