//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `IMAGE_EXTRACTOR__<SECTION>__<KEY>` environment variables. CLI flags are
//! applied on top by the binary.
//!
//! ```toml
//! [search]
//! base_url = "https://www.google.com/search"
//! settle_interval_ms = 3000
//! stall_limit = 3
//!
//! [downloads]
//! destination = "./"
//! image_count = 100
//! worker_count = 4
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::{PagerSettings, DEFAULT_SEARCH_URL};
use crate::utils::BROWSER_USER_AGENT;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "image-extractor.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Result feed settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Download settings
    #[serde(default)]
    pub downloads: DownloadConfig,
}

/// Result feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Image search endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Wait after each request for more results
    #[serde(default = "default_settle_interval_ms")]
    pub settle_interval_ms: u64,

    /// Consecutive idle iterations before the feed is considered exhausted
    #[serde(default = "default_stall_limit")]
    pub stall_limit: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            settle_interval_ms: default_settle_interval_ms(),
            stall_limit: default_stall_limit(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_settle_interval_ms() -> u64 {
    3000
}

fn default_stall_limit() -> u32 {
    3
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

/// Download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Parent of the per-query storage folder
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Number of images to download
    #[serde(default = "default_image_count")]
    pub image_count: usize,

    /// Size of the worker pool
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            image_count: default_image_count(),
            worker_count: default_worker_count(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_destination() -> PathBuf {
    PathBuf::from("./")
}

fn default_image_count() -> usize {
    100
}

fn default_worker_count() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn pager_settings(&self) -> PagerSettings {
        PagerSettings::default()
            .settle_interval(Duration::from_millis(self.search.settle_interval_ms))
            .stall_limit(self.search.stall_limit)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.downloads.timeout_secs)
    }

    /// Write the configuration as TOML, creating parent folders
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Errors writing a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Default per-user config location: `<config_dir>/image-extractor/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("image-extractor").join("config.toml"))
}

/// First existing config file among the local and per-user locations
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    user_config_path().filter(|p| p.is_file())
}

/// Load configuration.
///
/// An explicit `path` must exist; without one the discovered file (if any) is used.
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => builder = builder.add_source(config::File::from(path)),
        None => {
            if let Some(found) = find_config_file() {
                builder = builder.add_source(config::File::from(found).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("IMAGE_EXTRACTOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.downloads.image_count, 100);
        assert_eq!(config.downloads.worker_count, 4);
        assert_eq!(config.search.stall_limit, 3);
        assert_eq!(config.pager_settings().settle_interval, Duration::from_millis(3000));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extractor.toml");
        std::fs::write(&path, "[downloads]\nimage_count = 25\n\n[search]\nstall_limit = 5\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.downloads.image_count, 25);
        assert_eq!(config.downloads.worker_count, 4);
        assert_eq!(config.search.stall_limit, 5);
        assert_eq!(config.search.base_url, DEFAULT_SEARCH_URL);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.downloads.destination = PathBuf::from("/tmp/pictures");
        config.search.settle_interval_ms = 1500;
        config.save(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }
}
