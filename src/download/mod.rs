//! Download phase: fetch candidates with a bounded worker pool.
//!
//! - [`DownloadCoordinator`]: worker pool, claim cursor and target stop condition
//! - [`ImageFetcher`]: HTTP fetch, format resolution, decode and re-encode
//! - [`ProgressTracker`]: attempted/succeeded/failed counters shared by workers
//! - [`ensure_folder`] / [`StagedImage`]: storage folder and atomic writes
//!
//! # Example
//!
//! ```rust,no_run
//! use image_extractor::download::{DownloadCoordinator, ImageFetcher};
//! use image_extractor::utils::HttpClient;
//! use std::num::NonZeroUsize;
//!
//! # async fn example(candidates: Vec<image_extractor::models::ResultRecord>) -> anyhow::Result<()> {
//! let fetcher = ImageFetcher::new(HttpClient::new()?, "./images/apple_fruit", "apple_fruit");
//! let state = DownloadCoordinator::new(fetcher)
//!     .run(candidates, 100, NonZeroUsize::new(4).unwrap())
//!     .await;
//! println!("{} of 100", state.succeeded);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod fetcher;
mod progress;
mod storage;

pub use coordinator::DownloadCoordinator;
pub use fetcher::{extension, format_from_content_type, format_from_url, Fetch, ImageFetcher};
pub use progress::{ProgressState, ProgressTracker};
pub use storage::{ensure_folder, FolderStatus, StagedImage, StorageError};
