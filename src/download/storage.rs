//! Storage folder bootstrap and atomic file placement.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Whether [`ensure_folder`] had to create the folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Created,
    AlreadyExisted,
}

/// Storage errors that abort the run
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Cannot create storage folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage path {0} exists and is not a directory")]
    NotADirectory(PathBuf),
}

/// Create the storage folder (and its parents). An existing folder is not an error.
pub fn ensure_folder(path: &Path) -> Result<FolderStatus, StorageError> {
    if path.is_dir() {
        info!(path = %path.display(), "Storage folder already exists");
        return Ok(FolderStatus::AlreadyExisted);
    }
    if path.exists() {
        return Err(StorageError::NotADirectory(path.to_path_buf()));
    }

    std::fs::create_dir_all(path).map_err(|source| StorageError::CreateFolder {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Storage folder created");
    Ok(FolderStatus::Created)
}

/// Bytes written to a hidden temporary file next to their final name.
///
/// Nothing is visible under the final name until [`commit`](Self::commit);
/// dropping an uncommitted image removes the temporary file.
#[derive(Debug)]
pub struct StagedImage {
    temp: NamedTempFile,
    final_path: PathBuf,
}

impl StagedImage {
    /// Write `bytes` to a temporary file inside `folder`, destined for `folder/file_name`
    pub fn write(folder: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".part")
            .tempfile_in(folder)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        Ok(Self {
            temp,
            final_path: folder.join(file_name),
        })
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Rename into place
    pub fn commit(self) -> std::io::Result<PathBuf> {
        self.temp
            .persist(&self.final_path)
            .map_err(|e| e.error)?;
        Ok(self.final_path)
    }
}
