//! Storage gateway with one-time container provisioning.
//!
//! # Design
//! - The container is created lazily on first use, exactly once per process.
//! - Provisioning state lives in a single-assignment cell; a failed attempt leaves
//!   it empty so the next call retries.
//! - Existence checks are always live; nothing is cached locally.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::{BlobBackend, BlobStore, ObjectTags, UploadBody};

/// Gateway that guards every backend call behind container provisioning.
pub struct StorageGateway<B> {
    backend: Arc<B>,
    ready: OnceCell<()>,
}

impl<B: BlobBackend> StorageGateway<B> {
    /// Wrap `backend`; the container is provisioned on first use.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            ready: OnceCell::new(),
        }
    }

    /// Backend the gateway delegates to.
    #[must_use]
    pub const fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Whether container provisioning has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Create the container if needed. Safe to call concurrently; the backend
    /// sees at most one successful create call for the life of the gateway.
    ///
    /// # Errors
    ///
    /// Returns the backend error when provisioning fails.
    pub async fn ensure_ready(&self) -> StorageResult<()> {
        if self.ready.initialized() {
            return Ok(());
        }

        self.ready
            .get_or_try_init(|| async {
                self.backend.create_container_if_absent().await?;
                info!(
                    container = self.backend.container(),
                    "ensured blob container exists"
                );
                Ok::<(), StorageError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<B: BlobBackend> BlobStore for StorageGateway<B> {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.ensure_ready().await?;
        self.backend.object_exists(key).await
    }

    async fn upload(
        &self,
        key: &str,
        body: UploadBody,
        tags: Option<&ObjectTags>,
    ) -> StorageResult<()> {
        self.ensure_ready().await?;
        self.backend.put_object(key, body, tags).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingBackend {
        creates: AtomicUsize,
        fail_next_create: AtomicBool,
        objects: Mutex<BTreeSet<String>>,
    }

    #[async_trait]
    impl BlobBackend for CountingBackend {
        fn container(&self) -> &str {
            "uploads"
        }

        async fn create_container_if_absent(&self) -> StorageResult<()> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_next_create.swap(false, Ordering::SeqCst) {
                return Err(StorageError::status(
                    "create_container",
                    None,
                    503,
                    Some("ServerBusy".to_string()),
                ));
            }
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn object_exists(&self, key: &str) -> StorageResult<bool> {
            Ok(self
                .objects
                .lock()
                .map_err(|_| StorageError::status("object_exists", Some(key), 500, None))?
                .contains(key))
        }

        async fn put_object(
            &self,
            key: &str,
            _body: UploadBody,
            _tags: Option<&ObjectTags>,
        ) -> StorageResult<()> {
            self.objects
                .lock()
                .map_err(|_| StorageError::status("put_object", Some(key), 500, None))?
                .insert(key.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrent_first_calls_create_container_once() -> anyhow::Result<()> {
        let backend = Arc::new(CountingBackend::default());
        let gateway = Arc::new(StorageGateway::new(Arc::clone(&backend)));

        let mut handles = Vec::new();
        for index in 0..8 {
            let gateway = Arc::clone(&gateway);
            handles.push(tokio::spawn(async move {
                gateway.exists(&format!("file-{index}.pdf")).await
            }));
        }
        for handle in handles {
            assert!(!handle.await??);
        }

        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
        assert!(gateway.is_ready());
        gateway.ensure_ready().await?;
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_provisioning_is_retried_on_next_call() -> anyhow::Result<()> {
        let backend = Arc::new(CountingBackend::default());
        backend.fail_next_create.store(true, Ordering::SeqCst);
        let gateway = StorageGateway::new(Arc::clone(&backend));

        let err = gateway
            .exists("a.pdf")
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected provisioning failure"))?;
        assert!(matches!(err, StorageError::Status { status: 503, .. }));
        assert!(!gateway.is_ready());

        assert!(!gateway.exists("a.pdf").await?);
        assert!(gateway.is_ready());
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn upload_provisions_then_delegates() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("a.pdf");
        std::fs::write(&path, b"content")?;

        let backend = Arc::new(CountingBackend::default());
        let gateway = StorageGateway::new(Arc::clone(&backend));
        gateway
            .upload("a.pdf", UploadBody::open(&path).await?, None)
            .await?;

        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
        assert!(gateway.exists("a.pdf").await?);
        assert_eq!(gateway.backend().container(), "uploads");
        Ok(())
    }
}
