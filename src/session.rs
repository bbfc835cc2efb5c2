//! End-to-end run of one [`SearchSession`]: extraction, storage bootstrap, download.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::download::{ensure_folder, DownloadCoordinator, Fetch, ProgressState, ProgressTracker, StorageError};
use crate::extract::{
    ExtractionError, ExtractionReport, FeedPager, PageSource, PageSourceError, PagerOutcome, PagerSettings,
};
use crate::models::SearchSession;

/// Errors that abort a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Cannot open image search: {0}")]
    Open(#[from] PageSourceError),

    #[error("Cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Cancelled during {0}")]
    Cancelled(&'static str),
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub storage_folder: PathBuf,
    pub extraction: PagerOutcome,
    pub candidates: usize,
    pub target: usize,
    pub progress: ProgressState,
    /// The run was cancelled during the download phase
    pub cancelled: bool,
}

type ExtractedHook = Box<dyn FnOnce(&ExtractionReport) + Send>;

/// Runs the two phases of a session in order.
pub struct SessionRunner {
    destination: PathBuf,
    pager: PagerSettings,
    tracker: ProgressTracker,
    cancel: CancellationToken,
    on_extracted: Option<ExtractedHook>,
}

impl SessionRunner {
    /// Images land in `<destination>/<sanitized query>/`
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            pager: PagerSettings::default(),
            tracker: ProgressTracker::new(),
            cancel: CancellationToken::new(),
            on_extracted: None,
        }
    }

    pub fn pager_settings(mut self, settings: PagerSettings) -> Self {
        self.pager = settings;
        self
    }

    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Called once between the extraction and download phases
    pub fn on_extracted<H>(mut self, hook: H) -> Self
    where
        H: FnOnce(&ExtractionReport) + Send + 'static,
    {
        self.on_extracted = Some(Box::new(hook));
        self
    }

    /// Page the feed, create the storage folder, then download.
    ///
    /// `make_fetcher` receives the storage folder and the file name prefix.
    pub async fn run<P, F, M>(
        self,
        session: &SearchSession,
        source: P,
        make_fetcher: M,
    ) -> Result<SessionReport, SessionError>
    where
        P: PageSource,
        F: Fetch + 'static,
        M: FnOnce(&Path, &str) -> F,
    {
        info!(query = session.query(), target = session.target_count(), "Retrieving image URLs");
        let mut pager = FeedPager::new(source, self.pager);
        let finished = tokio::select! {
            report = pager.run(session.target_count()) => Some(report),
            _ = self.cancel.cancelled() => None,
        };
        let extraction = match finished {
            Some(report) => report?,
            None => {
                pager.terminate().await;
                return Err(SessionError::Cancelled("extraction"));
            }
        };
        if let Some(hook) = self.on_extracted {
            hook(&extraction);
        }

        let storage_folder = session.storage_folder(&self.destination);
        ensure_folder(&storage_folder)?;

        let candidates = extraction.candidates.len();
        info!(candidates, folder = %storage_folder.display(), "Downloading images");

        let fetcher = make_fetcher(&storage_folder, &session.sanitized_query());
        let progress = DownloadCoordinator::new(fetcher)
            .with_tracker(self.tracker)
            .with_cancellation(self.cancel.clone())
            .run(
                extraction.candidates.drain(),
                session.target_count(),
                session.worker_count(),
            )
            .await;

        Ok(SessionReport {
            storage_folder,
            extraction: extraction.outcome,
            candidates,
            target: session.target_count(),
            progress,
            cancelled: self.cancel.is_cancelled(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::StagedImage;
    use crate::extract::ScriptedPageSource;
    use crate::models::{FailureReason, ResultRecord};
    use async_trait::async_trait;
    use std::num::NonZeroUsize;
    use std::time::Duration;
    use tempfile::tempdir;

    struct NamingFetcher {
        folder: PathBuf,
        prefix: String,
    }

    #[async_trait]
    impl Fetch for NamingFetcher {
        async fn stage(&self, _record: &ResultRecord, index: usize) -> Result<StagedImage, FailureReason> {
            let name = format!("{}_{}.jpg", self.prefix, index);
            StagedImage::write(&self.folder, &name, b"jpg").map_err(FailureReason::from)
        }
    }

    fn fast() -> PagerSettings {
        PagerSettings::default().settle_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_full_session() {
        let dir = tempdir().unwrap();
        let session = SearchSession::new("apple fruit", 12, NonZeroUsize::new(3).unwrap()).unwrap();

        let report = SessionRunner::new(dir.path())
            .pager_settings(fast())
            .run(&session, ScriptedPageSource::with_total(40, 5), |folder, prefix| NamingFetcher {
                folder: folder.to_path_buf(),
                prefix: prefix.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(report.storage_folder, dir.path().join("apple_fruit"));
        assert_eq!(report.extraction, PagerOutcome::TargetReached);
        assert_eq!(report.progress.succeeded, 12);
        assert!(!report.cancelled);
        assert!(report.storage_folder.join("apple_fruit_0.jpg").exists());
    }

    #[tokio::test]
    async fn test_extracted_hook_sees_candidates() {
        let dir = tempdir().unwrap();
        let session = SearchSession::new("kiwi", 4, NonZeroUsize::new(2).unwrap()).unwrap();
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hook_seen = std::sync::Arc::clone(&seen);

        let report = SessionRunner::new(dir.path())
            .pager_settings(fast())
            .on_extracted(move |extraction| {
                hook_seen.store(extraction.candidates.len(), std::sync::atomic::Ordering::SeqCst)
            })
            .run(&session, ScriptedPageSource::with_total(3, 5), |folder, prefix| NamingFetcher {
                folder: folder.to_path_buf(),
                prefix: prefix.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(report.extraction, PagerOutcome::Stalled);
        assert_eq!(report.progress.succeeded, 3);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let session = SearchSession::new("pears", 50, NonZeroUsize::new(2).unwrap()).unwrap();
        let source = ScriptedPageSource::with_total(40, 5).fail_after_requests(0);

        let result = SessionRunner::new(dir.path())
            .pager_settings(fast())
            .run(&session, source, |folder, prefix| NamingFetcher {
                folder: folder.to_path_buf(),
                prefix: prefix.to_string(),
            })
            .await;

        assert!(matches!(result, Err(SessionError::Extraction(_))));
        assert!(!dir.path().join("pears").exists());
    }

    #[tokio::test]
    async fn test_cancelled_extraction() {
        let dir = tempdir().unwrap();
        let session = SearchSession::new("plums", 50, NonZeroUsize::new(2).unwrap()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedPageSource::with_total(40, 5);
        let disposed = source.disposed_flag();

        let result = SessionRunner::new(dir.path())
            .pager_settings(PagerSettings::default().settle_interval(Duration::from_secs(60)))
            .with_cancellation(cancel)
            .run(&session, source, |folder, prefix| NamingFetcher {
                folder: folder.to_path_buf(),
                prefix: prefix.to_string(),
            })
            .await;

        assert!(matches!(result, Err(SessionError::Cancelled("extraction"))));
        assert!(disposed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!dir.path().join("plums").exists());
    }

    #[tokio::test]
    async fn test_storage_failure_is_fatal() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("figs"), b"not a folder").unwrap();
        let session = SearchSession::new("figs", 3, NonZeroUsize::new(1).unwrap()).unwrap();

        let result = SessionRunner::new(dir.path())
            .pager_settings(fast())
            .run(&session, ScriptedPageSource::with_total(5, 5), |folder, prefix| NamingFetcher {
                folder: folder.to_path_buf(),
                prefix: prefix.to_string(),
            })
            .await;

        assert!(matches!(result, Err(SessionError::Storage(_))));
    }
}
