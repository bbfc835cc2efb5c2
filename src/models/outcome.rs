//! Per-item download outcomes.

use std::path::PathBuf;

/// Why a single candidate could not be downloaded.
///
/// These are recoverable: they are recorded and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// Connection, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Neither the URL nor the content type identify an image format
    #[error("Unknown image format")]
    UnknownFormat,

    /// Body is not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Image could not be re-encoded to the resolved format
    #[error("Encode error: {0}")]
    Encode(String),

    /// Writing to the storage folder failed
    #[error("IO error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for FailureReason {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FailureReason::Status(status.as_u16()),
            None => FailureReason::Network(err.to_string()),
        }
    }
}

impl From<std::io::Error> for FailureReason {
    fn from(err: std::io::Error) -> Self {
        FailureReason::Io(err.to_string())
    }
}

/// Result of downloading one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Failure(FailureReason),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success(_))
    }
}

impl From<Result<PathBuf, FailureReason>> for DownloadOutcome {
    fn from(result: Result<PathBuf, FailureReason>) -> Self {
        match result {
            Ok(path) => DownloadOutcome::Success(path),
            Err(reason) => DownloadOutcome::Failure(reason),
        }
    }
}
