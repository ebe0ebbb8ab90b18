//! Error types for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Settings file was not valid JSON.
    #[error("settings document is not valid json")]
    Json {
        /// File that failed to parse.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// Settings file parsed but its shape was unusable.
    #[error("invalid settings document")]
    InvalidDocument {
        /// File with the unexpected shape.
        path: PathBuf,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// `App.SourceFolder` is unset or blank.
    #[error("source folder is not configured")]
    MissingSourceFolder,
    /// `App.SourceFolder` does not name an existing directory.
    #[error("source folder does not exist")]
    SourceFolderNotFound {
        /// Configured folder.
        path: PathBuf,
    },
    /// `Blob.ConnectionString` is unset or blank.
    #[error("blob connection string is not configured")]
    MissingConnectionString,
    /// `Blob.ContainerName` is unset or blank.
    #[error("blob container name is not configured")]
    MissingContainerName,
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn invalid_field(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
