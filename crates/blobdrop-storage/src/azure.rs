//! Azure Blob Storage backend.
//!
//! # Design
//! - Object reads and writes go through `object_store`'s Azure client.
//! - Container creation is one signed REST call; the object-store client has no
//!   container management.
//! - Retries are disabled; the next polling cycle is the retry.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload,
    RetryConfig, TagSet,
};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::debug;
use url::Url;
use url::form_urlencoded;

use crate::connection::{BlobAuth, ConnectionString};
use crate::error::{StorageError, StorageResult};
use crate::signing;
use crate::{BlobBackend, ObjectTags, UploadBody};

/// REST API version sent with the container request.
pub const STORAGE_API_VERSION: &str = "2021-12-02";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// Backend bound to a single blob container.
pub struct AzureBlobBackend {
    client: Client,
    store: MicrosoftAzure,
    connection: ConnectionString,
    container: String,
}

impl AzureBlobBackend {
    /// Build a backend with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be constructed.
    pub fn new(connection: ConnectionString, container: impl Into<String>) -> StorageResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| StorageError::request("client.build", None, source))?;
        Self::with_client(client, connection, container)
    }

    /// Parse `connection_string` and build a backend for `container`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or a client cannot be built.
    pub fn from_connection_string(
        connection_string: &str,
        container: impl Into<String>,
    ) -> StorageResult<Self> {
        Self::new(ConnectionString::parse(connection_string)?, container)
    }

    /// Build a backend that creates the container through `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the object-store client cannot be configured.
    pub fn with_client(
        client: Client,
        connection: ConnectionString,
        container: impl Into<String>,
    ) -> StorageResult<Self> {
        let container = container.into();
        let store = object_store_for(&connection, &container)?;
        Ok(Self {
            client,
            store,
            connection,
            container,
        })
    }

    /// URL of the container resource, including the `restype=container` marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob endpoint cannot carry a path.
    pub fn container_url(&self) -> StorageResult<Url> {
        let mut url = self.connection.blob_endpoint().clone();
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::invalid_connection_string("BlobEndpoint", "cannot_be_a_base")
            })?
            .pop_if_empty()
            .push(&self.container);
        url.query_pairs_mut().append_pair("restype", "container");
        if let BlobAuth::SharedAccessSignature(token) = self.connection.auth() {
            let combined = match url.query() {
                Some(existing) => format!("{existing}&{token}"),
                None => token.clone(),
            };
            url.set_query(Some(&combined));
        }
        Ok(url)
    }

    async fn send_signed(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
    ) -> StorageResult<Response> {
        let mut headers = HeaderMap::new();
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        headers.insert("x-ms-date", header_value("x-ms-date", &date)?);
        headers.insert("x-ms-version", HeaderValue::from_static(STORAGE_API_VERSION));

        if let BlobAuth::SharedKey { account, key } = self.connection.auth() {
            let to_sign = signing::string_to_sign(&method, &url, account, &headers);
            let signature = signing::sign(key, &to_sign)?;
            headers.insert(
                AUTHORIZATION,
                header_value("authorization", &signing::authorization(account, &signature))?,
            );
        }

        self.client
            .request(method, url)
            .headers(headers)
            .send()
            .await
            .map_err(|source| StorageError::request(operation, None, source))
    }
}

#[async_trait]
impl BlobBackend for AzureBlobBackend {
    fn container(&self) -> &str {
        &self.container
    }

    async fn create_container_if_absent(&self) -> StorageResult<()> {
        const OPERATION: &str = "create_container";
        let response = self
            .send_signed(OPERATION, Method::PUT, self.container_url()?)
            .await?;

        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT => {
                debug!(container = %self.container, "blob container already exists");
                Ok(())
            }
            status => Err(StorageError::status(
                OPERATION,
                None,
                status.as_u16(),
                error_code(&response),
            )),
        }
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        match self.store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(source) => Err(StorageError::object_store("object_exists", Some(key), source)),
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        tags: Option<&ObjectTags>,
    ) -> StorageResult<()> {
        let payload = PutPayload::from(body.into_bytes().await?);
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type_for(key)),
        );
        let options = PutOptions {
            tags: tags.map(tag_set).unwrap_or_default(),
            attributes,
            ..PutOptions::default()
        };

        self.store
            .put_opts(&ObjectPath::from(key), payload, options)
            .await
            .map_err(|source| StorageError::object_store("put_object", Some(key), source))?;
        Ok(())
    }
}

fn object_store_for(
    connection: &ConnectionString,
    container: &str,
) -> StorageResult<MicrosoftAzure> {
    let endpoint = connection.blob_endpoint();
    let builder = MicrosoftAzureBuilder::new()
        .with_account(connection.account_name())
        .with_container_name(container)
        .with_endpoint(endpoint.as_str().trim_end_matches('/').to_string())
        .with_allow_http(endpoint.scheme() == "http")
        .with_client_options(ClientOptions::new().with_connect_timeout(CONNECT_TIMEOUT))
        .with_retry(RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        });
    let builder = match connection.auth() {
        BlobAuth::SharedKey { key, .. } => builder.with_access_key(STANDARD.encode(key)),
        BlobAuth::SharedAccessSignature(token) => builder.with_sas_authorization(
            form_urlencoded::parse(token.as_bytes())
                .into_owned()
                .collect::<Vec<_>>(),
        ),
    };
    builder
        .build()
        .map_err(|source| StorageError::object_store("backend.build", None, source))
}

/// Convert upload tags into the object-store tag set.
#[must_use]
pub fn tag_set(tags: &ObjectTags) -> TagSet {
    let mut set = TagSet::default();
    for (name, value) in tags {
        set.push(name, value);
    }
    set
}

fn header_value(header: &'static str, value: &str) -> StorageResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|source| StorageError::header(header, source))
}

fn error_code(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Content type recorded for an object, inferred from the key's extension.
#[must_use]
pub fn content_type_for(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("tif" | "tiff") => "image/tiff",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}
