//! In-memory blob backend with call counters and failure injection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use blobdrop_storage::{BlobBackend, ObjectTags, StorageError, StorageResult, UploadBody};

/// Object captured by [`MemoryBlobBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Uploaded bytes.
    pub content: Vec<u8>,
    /// Tags attached at upload time.
    pub tags: ObjectTags,
}

/// `BlobBackend` keeping objects in a map.
#[derive(Debug, Default)]
pub struct MemoryBlobBackend {
    container: String,
    latency: Option<Duration>,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_keys: Mutex<BTreeSet<String>>,
    create_failures: AtomicUsize,
    create_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryBlobBackend {
    /// Empty backend bound to `container`.
    #[must_use]
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Self::default()
        }
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed an object as if it had been uploaded earlier.
    pub fn insert(&self, key: &str, content: &[u8]) {
        lock(&self.objects).insert(
            key.to_string(),
            StoredObject {
                content: content.to_vec(),
                tags: ObjectTags::new(),
            },
        );
    }

    /// Stored object for `key`.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }

    /// Keys currently stored, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Make existence checks and uploads for `key` fail.
    pub fn fail_key(&self, key: &str) {
        lock(&self.failing_keys).insert(key.to_string());
    }

    /// Make the next `count` container creations fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.create_failures.store(count, Ordering::SeqCst);
    }

    /// Number of successful container creations.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of existence checks served.
    #[must_use]
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Number of uploads attempted.
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_key(&self, operation: &'static str, key: &str) -> StorageResult<()> {
        if lock(&self.failing_keys).contains(key) {
            return Err(StorageError::Status {
                operation,
                key: Some(key.to_string()),
                status: 500,
                error_code: Some("InternalError".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    fn container(&self) -> &str {
        &self.container
    }

    async fn create_container_if_absent(&self) -> StorageResult<()> {
        self.delay().await;
        let remaining = self.create_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.create_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Status {
                operation: "create_container",
                key: None,
                status: 503,
                error_code: Some("ServerBusy".to_string()),
            });
        }
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_key("object_exists", key)?;
        Ok(lock(&self.objects).contains_key(key))
    }

    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        tags: Option<&ObjectTags>,
    ) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check_key("put_object", key)?;
        let content = body.into_bytes().await?;
        lock(&self.objects).insert(
            key.to_string(),
            StoredObject {
                content,
                tags: tags.cloned().unwrap_or_default(),
            },
        );
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
