//! Core data models for search sessions, parsed results and download outcomes.

mod outcome;
mod record;
mod session;

pub use outcome::{DownloadOutcome, FailureReason};
pub use record::ResultRecord;
pub use session::{sanitize_query, SearchSession};
