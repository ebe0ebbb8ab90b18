//! Typed settings models.
//!
//! # Design
//! - Pure data carriers produced by the loader and consumed by the agent.
//! - Defaults live in `defaults.rs`; normalisation of blank values happens in accessors.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::defaults::{
    DEFAULT_DELETE_AFTER_UPLOAD, DEFAULT_DUPLICATE_FOLDER, DEFAULT_LOG_LEVEL,
    DEFAULT_POLLING_INTERVAL_SECS, DEFAULT_SEARCH_PATTERN, MIN_POLLING_INTERVAL_SECS,
};
use crate::error::ConfigError;

/// Settings that drive each polling cycle; re-read at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Folder scanned for candidate files. Empty when unset.
    pub source_folder: PathBuf,
    /// Glob matched against file names.
    pub search_pattern: String,
    /// Remove the local file once its upload succeeds.
    pub delete_after_upload: bool,
    /// Name of the optional tag attached to uploads.
    pub tag_name: Option<String>,
    /// Value of the optional tag attached to uploads.
    pub tag_value: Option<String>,
    /// Seconds to sleep between cycles as configured.
    pub polling_interval_seconds: u64,
    /// Sub-folder of the source folder that receives duplicates.
    pub duplicate_folder_name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::new(),
            search_pattern: DEFAULT_SEARCH_PATTERN.to_string(),
            delete_after_upload: DEFAULT_DELETE_AFTER_UPLOAD,
            tag_name: None,
            tag_value: None,
            polling_interval_seconds: DEFAULT_POLLING_INTERVAL_SECS,
            duplicate_folder_name: DEFAULT_DUPLICATE_FOLDER.to_string(),
        }
    }
}

impl AppSettings {
    /// Settings for `source_folder` with every other field at its default.
    #[must_use]
    pub fn for_folder(source_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_folder: source_folder.into(),
            ..Self::default()
        }
    }

    /// Sleep between cycles, never shorter than one second.
    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds.max(MIN_POLLING_INTERVAL_SECS))
    }

    /// Effective glob; blank patterns fall back to `*.pdf`.
    #[must_use]
    pub fn search_pattern(&self) -> &str {
        let pattern = self.search_pattern.trim();
        if pattern.is_empty() {
            DEFAULT_SEARCH_PATTERN
        } else {
            pattern
        }
    }

    /// Folder that receives duplicates.
    #[must_use]
    pub fn duplicate_folder(&self) -> PathBuf {
        let name = self.duplicate_folder_name.trim();
        let name = if name.is_empty() {
            DEFAULT_DUPLICATE_FOLDER
        } else {
            name
        };
        self.source_folder.join(name)
    }

    /// Tag pair attached to uploads, present only when both parts are non-blank.
    #[must_use]
    pub fn tag(&self) -> Option<(&str, &str)> {
        let name = self.tag_name.as_deref().map(str::trim)?;
        let value = self.tag_value.as_deref().map(str::trim)?;
        if name.is_empty() || value.is_empty() {
            return None;
        }
        Some((name, value))
    }

    /// Whether the source folder setting is blank.
    #[must_use]
    pub fn source_folder_is_unset(&self) -> bool {
        self.source_folder.as_os_str().is_empty()
    }

    /// Source folder as a path.
    #[must_use]
    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }
}

/// Remote storage settings; fixed for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSettings {
    /// Storage account connection string. Empty when unset.
    pub connection_string: String,
    /// Target container. Empty when unset.
    pub container_name: String,
}

/// Output format requested in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatPreference {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

impl FromStr for LogFormatPreference {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::invalid_field(
                "Logging",
                "Format",
                Some(value.to_string()),
                "unsupported_format",
            )),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Format override; `None` infers from the build profile.
    pub format: Option<LogFormatPreference>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Complete settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Per-cycle agent settings.
    pub app: AppSettings,
    /// Storage settings.
    pub blob: BlobSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}
