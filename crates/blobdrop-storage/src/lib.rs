#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Object-storage access for blobdrop.
//!
//! Layout: `lib.rs` (backend and gateway traits, upload bodies), `gateway.rs`
//! (one-time container provisioning), `azure.rs` (Azure Blob backend over `object_store`),
//! `connection.rs` (connection string parsing), `signing.rs` (Shared Key auth).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub mod azure;
pub mod connection;
pub mod error;
pub mod gateway;
pub mod signing;

pub use azure::AzureBlobBackend;
pub use connection::{BlobAuth, ConnectionString};
pub use error::{StorageError, StorageResult};
pub use gateway::StorageGateway;

/// Key/value tags attached to an uploaded object.
pub type ObjectTags = BTreeMap<String, String>;

/// Raw operations offered by a remote object-storage container.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Name of the container the backend is bound to.
    fn container(&self) -> &str;

    /// Create the container with private access when it does not exist yet.
    async fn create_container_if_absent(&self) -> StorageResult<()>;

    /// Whether an object with the given key is present in the container.
    async fn object_exists(&self, key: &str) -> StorageResult<bool>;

    /// Store `body` under `key`, attaching `tags` when provided.
    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        tags: Option<&ObjectTags>,
    ) -> StorageResult<()>;
}

/// Storage contract consumed by the file processor.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Live existence check for `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Upload `body` under `key` with optional tags.
    async fn upload(
        &self,
        key: &str,
        body: UploadBody,
        tags: Option<&ObjectTags>,
    ) -> StorageResult<()>;
}

/// Local file content opened for upload.
#[derive(Debug)]
pub struct UploadBody {
    file: File,
    length: u64,
    path: PathBuf,
}

impl UploadBody {
    /// Open `path` for reading and capture its length.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its metadata cannot be read.
    pub async fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path)
            .await
            .map_err(|err| StorageError::io("upload_body.open", path, err))?;
        let length = file
            .metadata()
            .await
            .map_err(|err| StorageError::io("upload_body.metadata", path, err))?
            .len();
        Ok(Self {
            file,
            length,
            path: path.to_path_buf(),
        })
    }

    /// Number of bytes that will be uploaded.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.length
    }

    /// Whether the body carries no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Source path of the content.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full content into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the file fails.
    pub async fn into_bytes(mut self) -> StorageResult<Vec<u8>> {
        let capacity = usize::try_from(self.length).unwrap_or_default();
        let mut buffer = Vec::with_capacity(capacity);
        self.file
            .read_to_end(&mut buffer)
            .await
            .map_err(|err| StorageError::io("upload_body.read", &self.path, err))?;
        Ok(buffer)
    }
}
