//! Extraction phase: drive a result feed and collect candidate image locators.
//!
//! The feed itself is rendered by an external collaborator implementing
//! [`PageSource`]. [`FeedPager`] drives it with the pagination protocol,
//! [`parse_results`] turns the markup into [`ResultRecord`](crate::models::ResultRecord)s
//! and [`CandidateQueue`] keeps the deduplicated, ordered result set.
//!
//! # Implementing a New Page Source
//!
//! 1. Create a struct that implements `PageSource`
//! 2. `current_markup` must return the whole rendered feed, not only the newest page
//! 3. `advance_control` returns [`ControlProbe::Absent`] when the feed has no
//!    "show more" affordance; that is not an error
//! 4. Return [`PageSourceError`] only when the backend can no longer be driven

mod http_source;
pub mod mock;
mod pager;
mod parser;
mod queue;

pub use http_source::{HttpPageSource, DEFAULT_SEARCH_URL};
pub use mock::ScriptedPageSource;
pub use pager::{ExtractionReport, FeedPager, PagerOutcome, PagerSettings, PagerState};
pub use parser::parse_results;
pub use queue::CandidateQueue;

use async_trait::async_trait;

/// Outcome of probing for an optional "load more" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlProbe {
    /// The control was present and has been activated
    Activated,
    /// The feed has no such control right now
    Absent,
}

/// The rendering backend that produces the result feed markup.
#[async_trait]
pub trait PageSource: Send {
    /// Snapshot of the markup rendered so far
    async fn current_markup(&mut self) -> Result<String, PageSourceError>;

    /// Trigger the next page render (scroll-to-bottom or equivalent)
    async fn request_more(&mut self) -> Result<(), PageSourceError>;

    /// Best-effort activation of a "show more results" control
    async fn advance_control(&mut self) -> Result<ControlProbe, PageSourceError> {
        Ok(ControlProbe::Absent)
    }

    /// Release the backend
    async fn dispose(&mut self) -> Result<(), PageSourceError> {
        Ok(())
    }
}

#[async_trait]
impl<P: PageSource + ?Sized> PageSource for Box<P> {
    async fn current_markup(&mut self) -> Result<String, PageSourceError> {
        (**self).current_markup().await
    }

    async fn request_more(&mut self) -> Result<(), PageSourceError> {
        (**self).request_more().await
    }

    async fn advance_control(&mut self) -> Result<ControlProbe, PageSourceError> {
        (**self).advance_control().await
    }

    async fn dispose(&mut self) -> Result<(), PageSourceError> {
        (**self).dispose().await
    }
}

/// Errors raised by a [`PageSource`]
#[derive(Debug, thiserror::Error)]
pub enum PageSourceError {
    /// The backend could not be reached or answered with an error
    #[error("Network error: {0}")]
    Network(String),

    /// The backend has been disposed or crashed
    #[error("Page source unavailable: {0}")]
    Unavailable(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for PageSourceError {
    fn from(err: reqwest::Error) -> Self {
        PageSourceError::Network(err.to_string())
    }
}

/// Fatal failures of the extraction phase
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The page source could not be driven; no partial results are kept
    #[error("Page source failed during {stage}: {source}")]
    PageSource {
        stage: &'static str,
        #[source]
        source: PageSourceError,
    },
}

impl ExtractionError {
    pub(crate) fn at(stage: &'static str) -> impl FnOnce(PageSourceError) -> Self {
        move |source| ExtractionError::PageSource { stage, source }
    }
}
