//! # Image Extractor
//!
//! Collects image URLs from an infinite-scroll image search feed and
//! downloads a target number of them with a bounded worker pool.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (SearchSession, ResultRecord, DownloadOutcome)
//! - [`extract`]: Page source trait, result parser, feed pager and candidate queue
//! - [`download`]: Image fetcher, download coordinator and progress tracking
//! - [`session`]: Runs both phases for one search session
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal progress and report output
//! - [`utils`]: HTTP client

pub mod config;
pub mod download;
pub mod extract;
pub mod models;
pub mod session;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{DownloadOutcome, ResultRecord, SearchSession};
pub use session::{SessionError, SessionReport, SessionRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
