//! Parsing for storage account connection strings.
//!
//! # Design
//! - Accept the `Name=Value;` segment format with case-insensitive names.
//! - Resolve the blob endpoint and credentials once so request code never re-parses.
//! - Never print account keys or SAS tokens through `Debug`.

use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::error::{StorageError, StorageResult};

/// Account name used by the local storage emulator.
pub const DEVELOPMENT_ACCOUNT: &str = "devstoreaccount1";
const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const DEFAULT_PROTOCOL: &str = "https";

/// Credentials used to authorise requests against the blob service.
#[derive(Clone)]
pub enum BlobAuth {
    /// Shared Key authorisation with the decoded account key.
    SharedKey {
        /// Storage account name.
        account: String,
        /// Decoded account key bytes.
        key: Vec<u8>,
    },
    /// Pre-signed SAS token appended to every request URL.
    SharedAccessSignature(String),
}

impl Debug for BlobAuth {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey { account, .. } => formatter
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"<redacted>")
                .finish(),
            Self::SharedAccessSignature(_) => formatter
                .debug_tuple("SharedAccessSignature")
                .field(&"<redacted>")
                .finish(),
        }
    }
}

/// Parsed storage connection string.
#[derive(Clone, Debug)]
pub struct ConnectionString {
    blob_endpoint: Url,
    account: String,
    auth: BlobAuth,
}

#[derive(Default)]
struct Segments {
    protocol: Option<String>,
    account: Option<String>,
    account_key: Option<String>,
    endpoint_suffix: Option<String>,
    blob_endpoint: Option<String>,
    sas: Option<String>,
    development: bool,
}

impl ConnectionString {
    /// Parse a connection string such as
    /// `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...;EndpointSuffix=core.windows.net`.
    ///
    /// # Errors
    ///
    /// Returns an error when a segment is malformed, credentials are missing,
    /// the account key is not base64, or the endpoint is not a valid URL.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let mut segments = split_segments(raw)?;

        if segments.development {
            segments
                .account
                .get_or_insert_with(|| DEVELOPMENT_ACCOUNT.to_string());
            if segments.account_key.is_none() && segments.sas.is_none() {
                segments.account_key = Some(DEVELOPMENT_ACCOUNT_KEY.to_string());
            }
            segments
                .blob_endpoint
                .get_or_insert_with(|| DEVELOPMENT_BLOB_ENDPOINT.to_string());
        }

        let blob_endpoint = resolve_endpoint(&segments)?;
        let account = segments
            .account
            .clone()
            .unwrap_or_else(|| account_from_endpoint(&blob_endpoint));
        let auth = resolve_auth(segments)?;
        Ok(Self {
            blob_endpoint,
            account,
            auth,
        })
    }

    /// Base URL of the blob service.
    #[must_use]
    pub const fn blob_endpoint(&self) -> &Url {
        &self.blob_endpoint
    }

    /// Storage account name; derived from the endpoint for SAS-only strings.
    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.account
    }

    /// Credentials used for requests.
    #[must_use]
    pub const fn auth(&self) -> &BlobAuth {
        &self.auth
    }
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn split_segments(raw: &str) -> StorageResult<Segments> {
    let mut segments = Segments::default();
    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((name, value)) = segment.split_once('=') else {
            return Err(StorageError::invalid_connection_string(
                "segment",
                "missing_separator",
            ));
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_lowercase().as_str() {
            "defaultendpointsprotocol" => segments.protocol = Some(value.to_ascii_lowercase()),
            "accountname" => segments.account = Some(value),
            "accountkey" => segments.account_key = Some(value),
            "endpointsuffix" => segments.endpoint_suffix = Some(value),
            "blobendpoint" => segments.blob_endpoint = Some(value),
            "sharedaccesssignature" => {
                segments.sas = Some(value.trim_start_matches('?').to_string());
            }
            "usedevelopmentstorage" => segments.development = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }
    Ok(segments)
}

fn resolve_endpoint(segments: &Segments) -> StorageResult<Url> {
    let text = if let Some(endpoint) = &segments.blob_endpoint {
        endpoint.clone()
    } else {
        let account = segments.account.as_deref().ok_or_else(|| {
            StorageError::invalid_connection_string("AccountName", "missing")
        })?;
        let protocol = segments.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL);
        if protocol != "https" && protocol != "http" {
            return Err(StorageError::invalid_connection_string(
                "DefaultEndpointsProtocol",
                "unsupported_protocol",
            ));
        }
        let suffix = segments
            .endpoint_suffix
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
        format!("{protocol}://{account}.blob.{suffix}")
    };

    Url::parse(&text).map_err(|source| StorageError::InvalidUrl {
        operation: "connection_string.blob_endpoint",
        value: text.clone(),
        source,
    })
}

fn account_from_endpoint(endpoint: &Url) -> String {
    let host = endpoint.host_str().unwrap_or_default();
    if let Some((account, _)) = host.split_once(".blob.") {
        return account.to_string();
    }
    endpoint
        .path_segments()
        .and_then(|mut segments| segments.find(|segment| !segment.is_empty()))
        .map_or_else(|| host.to_string(), str::to_string)
}

fn resolve_auth(segments: Segments) -> StorageResult<BlobAuth> {
    if let Some(encoded) = segments.account_key {
        let account = segments.account.ok_or_else(|| {
            StorageError::invalid_connection_string("AccountName", "required_with_account_key")
        })?;
        let key = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|source| StorageError::InvalidAccountKey { source })?;
        return Ok(BlobAuth::SharedKey { account, key });
    }

    match segments.sas {
        Some(token) if !token.is_empty() => Ok(BlobAuth::SharedAccessSignature(token)),
        Some(_) => Err(StorageError::invalid_connection_string(
            "SharedAccessSignature",
            "empty",
        )),
        None => Err(StorageError::invalid_connection_string(
            "AccountKey",
            "missing_credentials",
        )),
    }
}
