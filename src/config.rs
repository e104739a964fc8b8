//! Engine configuration file.
//!
//! The file is JSON. Every field is optional and falls back to its default,
//! so a file holding `{}` is valid.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paging::config::PagingConfig;
use crate::sync::config::SyncConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration for the paging and sync layers.
///
/// # Examples
///
/// ```
/// use scrollback::config::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "paging": { "page_size": 30 } }"#, "inline").unwrap();
/// assert_eq!(config.paging.page_size, 30);
/// assert_eq!(config.sync.resume_window, 50);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Paging controller tuning.
    pub paging: PagingConfig,
    /// Sync channel tuning.
    pub sync: SyncConfig,
}

impl EngineConfig {
    /// Parses configuration JSON. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the JSON is malformed or mistyped.
    pub fn from_json(json: &str, origin: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })
    }

    /// Loads `file_name` from an already opened directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if it is not valid configuration.
    pub fn load_from_dir(dir: &Dir, file_name: &str) -> ConfigResult<Self> {
        let json = dir.read_to_string(file_name).map_err(|source| ConfigError::Io {
            path: file_name.to_owned(),
            source,
        })?;
        Self::from_json(&json, file_name)
    }

    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if it is not valid configuration.
    pub fn load(path: &Utf8Path) -> ConfigResult<Self> {
        let io_error = |source| ConfigError::Io {
            path: path.to_string(),
            source,
        };
        let file_name = path.file_name().ok_or_else(|| {
            io_error(std::io::Error::other("path must include a file name"))
        })?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        Self::load_from_dir(&dir, file_name)
    }
}
