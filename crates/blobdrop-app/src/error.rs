//! # Design
//!
//! - Centralize application-level errors for bootstrap and the polling loop.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use blobdrop_config::ConfigError;
use blobdrop_fsops::FsOpsError;
use blobdrop_storage::StorageError;
use blobdrop_telemetry::TelemetryError;
use thiserror::Error;
use tokio::task::JoinError;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// Startup validation rejected the settings; each problem was already logged.
    #[error("invalid configuration")]
    InvalidConfiguration {
        /// Number of distinct problems found.
        count: usize,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
    /// Storage backend construction failed.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source storage error.
        source: StorageError,
    },
    /// Scanning or file processing failed.
    #[error("file processing failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: FsOpsError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// A background task panicked or was aborted.
    #[error("background task join failed")]
    TaskJoin {
        /// Operation identifier.
        operation: &'static str,
        /// Source join error.
        source: JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn storage(operation: &'static str, source: StorageError) -> Self {
        Self::Storage { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: Some(path.into()),
            source,
        }
    }

    /// Whether the error reports a requested shutdown rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::FsOps { source, .. } if source.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config("load", ConfigError::MissingContainerName);
        assert!(matches!(config, AppError::Config { .. }));
        assert!(config.source().is_some());

        let storage = AppError::storage(
            "connect",
            StorageError::InvalidConnectionString {
                field: "AccountName",
                reason: "missing",
            },
        );
        assert!(matches!(storage, AppError::Storage { .. }));

        let io_err = AppError::io("create", "/tmp/inbox", io::Error::other("io"));
        assert!(matches!(io_err, AppError::Io { path: Some(_), .. }));
        assert!(!io_err.is_cancelled());
    }

    #[test]
    fn cancellation_is_recognised_through_fsops() {
        let cancelled = AppError::fsops(
            "process",
            FsOpsError::Cancelled {
                operation: "storage.upload",
            },
        );
        assert!(cancelled.is_cancelled());

        let failed = AppError::fsops(
            "scan",
            FsOpsError::InvalidInput {
                field: "path",
                reason: "missing_file_name",
                value: None,
            },
        );
        assert!(!failed.is_cancelled());
        assert_eq!(failed.to_string(), "file processing failed");
    }
}
