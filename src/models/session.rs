//! Search session parameters.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// One end-to-end run: what to search for, how many images, how many workers.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSession {
    query: String,
    target_count: usize,
    worker_count: NonZeroUsize,
}

impl SearchSession {
    /// Create a session. Returns `None` for a blank query.
    pub fn new(query: impl Into<String>, target_count: usize, worker_count: NonZeroUsize) -> Option<Self> {
        let query = query.into().trim().to_string();
        if query.is_empty() {
            return None;
        }

        Some(Self {
            query,
            target_count,
            worker_count,
        })
    }

    /// Raw query text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of images to download
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Size of the download worker pool
    pub fn worker_count(&self) -> NonZeroUsize {
        self.worker_count
    }

    /// Query with spaces replaced by underscores; names the folder and every file
    pub fn sanitized_query(&self) -> String {
        sanitize_query(&self.query)
    }

    /// `<destination>/<sanitized_query>`
    pub fn storage_folder(&self, destination: &Path) -> PathBuf {
        destination.join(self.sanitized_query())
    }
}

/// Replace spaces with underscores.
///
/// Path separators are replaced as well, and an all-dot name (`.`, `..`)
/// becomes underscores, so the result is always a single child component
/// of the destination folder.
pub fn sanitize_query(query: &str) -> String {
    let sanitized: String = query
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        return sanitized.replace('.', "_");
    }
    sanitized
}
