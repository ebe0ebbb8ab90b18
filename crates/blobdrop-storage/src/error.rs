//! # Design
//!
//! - Provide structured, constant-message errors for the storage gateway and backends.
//! - Capture operation context (keys, paths, fields) so failures can be traced to a blob.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by the storage gateway and its backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport-level failures while talking to the storage service.
    #[error("storage request failed")]
    Request {
        /// Operation that issued the request.
        operation: &'static str,
        /// Object key involved in the request, when the request targets an object.
        key: Option<String>,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The storage service answered with an unexpected status code.
    #[error("storage request returned an unexpected status")]
    Status {
        /// Operation that issued the request.
        operation: &'static str,
        /// Object key involved in the request, when the request targets an object.
        key: Option<String>,
        /// HTTP status code returned by the service.
        status: u16,
        /// Service error code (`x-ms-error-code`) when present.
        error_code: Option<String>,
    },
    /// The object-store client reported a failure.
    #[error("object store operation failed")]
    ObjectStore {
        /// Operation that called the object store.
        operation: &'static str,
        /// Object key involved, when the call targets an object.
        key: Option<String>,
        /// Underlying object-store error.
        source: Box<object_store::Error>,
    },
    /// IO failures while preparing or reading upload content.
    #[error("storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The connection string was missing a field or carried an invalid value.
    #[error("invalid storage connection string")]
    InvalidConnectionString {
        /// Connection string field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The account key was not valid base64.
    #[error("invalid storage account key")]
    InvalidAccountKey {
        /// Underlying base64 decode error.
        source: base64::DecodeError,
    },
    /// A storage URL could not be constructed.
    #[error("invalid storage url")]
    InvalidUrl {
        /// Operation that built the URL.
        operation: &'static str,
        /// URL text that failed to parse.
        value: String,
        /// Underlying URL parse error.
        source: url::ParseError,
    },
    /// A request header value could not be encoded.
    #[error("invalid storage request header")]
    InvalidHeader {
        /// Header that failed to encode.
        header: &'static str,
        /// Underlying header error.
        source: InvalidHeaderValue,
    },
}

impl StorageError {
    pub(crate) fn request(
        operation: &'static str,
        key: Option<&str>,
        source: reqwest::Error,
    ) -> Self {
        Self::Request {
            operation,
            key: key.map(str::to_string),
            source,
        }
    }

    pub(crate) fn status(
        operation: &'static str,
        key: Option<&str>,
        status: u16,
        error_code: Option<String>,
    ) -> Self {
        Self::Status {
            operation,
            key: key.map(str::to_string),
            status,
            error_code,
        }
    }

    pub(crate) fn object_store(
        operation: &'static str,
        key: Option<&str>,
        source: object_store::Error,
    ) -> Self {
        Self::ObjectStore {
            operation,
            key: key.map(str::to_string),
            source: Box::new(source),
        }
    }

    /// Build an IO error for the given operation and path.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn invalid_connection_string(
        field: &'static str,
        reason: &'static str,
    ) -> Self {
        Self::InvalidConnectionString { field, reason }
    }

    pub(crate) const fn header(header: &'static str, source: InvalidHeaderValue) -> Self {
        Self::InvalidHeader { header, source }
    }
}
