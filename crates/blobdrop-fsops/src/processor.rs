//! Per-file upload/duplicate/delete decision.
//!
//! # Design
//! - The object key is the file's base name; a key that already exists remotely
//!   is never overwritten, the file is moved to the duplicate folder instead.
//! - Steps for one file are strictly ordered: existence check, upload, local delete.
//! - Backend calls race the cancellation token and stop with `FsOpsError::Cancelled`.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blobdrop_config::AppSettings;
use blobdrop_storage::{BlobStore, ObjectTags, UploadBody};
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::ProcessOutcome;

const DUPLICATE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Decides and performs the action for each candidate file.
pub struct FileProcessor<S> {
    store: Arc<S>,
}

impl<S: BlobStore> FileProcessor<S> {
    /// Processor uploading through `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Upload `path`, or move it aside when its key already exists remotely.
    ///
    /// # Errors
    ///
    /// Returns an error when the file name is unusable, a storage call fails,
    /// a local move or delete fails, or `cancel` fires during a storage call.
    pub async fn process(
        &self,
        path: &Path,
        settings: &AppSettings,
        cancel: &CancellationToken,
    ) -> FsOpsResult<ProcessOutcome> {
        if !is_regular_file(path).await {
            debug!(file = %path.display(), "file disappeared before processing");
            return Ok(ProcessOutcome::no_action());
        }

        let key = object_key(path)?;
        let exists = until_cancelled(cancel, "storage.exists", self.store.exists(key))
            .await?
            .map_err(|source| FsOpsError::storage("storage.exists", key, source))?;

        if exists {
            let destination = move_to_duplicates(path, &settings.duplicate_folder()).await?;
            info!(
                file = %path.display(),
                destination = %destination.display(),
                "object already exists; moved file to duplicate folder"
            );
            return Ok(ProcessOutcome::duplicated());
        }

        let body = UploadBody::open(path)
            .await
            .map_err(|source| FsOpsError::storage("storage.open_body", key, source))?;
        let tags = upload_tags(settings);
        until_cancelled(
            cancel,
            "storage.upload",
            self.store.upload(key, body, tags.as_ref()),
        )
        .await?
        .map_err(|source| FsOpsError::storage("storage.upload", key, source))?;
        info!(file = %path.display(), key, "uploaded file");

        if !settings.delete_after_upload {
            return Ok(ProcessOutcome::uploaded(false));
        }
        fs::remove_file(path)
            .await
            .map_err(|err| FsOpsError::io("processor.delete", path, err))?;
        info!(file = %path.display(), "deleted local file after upload");
        Ok(ProcessOutcome::uploaded(true))
    }
}

/// Destination key for `path`: its UTF-8 base name.
///
/// # Errors
///
/// Returns `FsOpsError::InvalidInput` when the path has no file name or the
/// name is not valid UTF-8.
pub fn object_key(path: &Path) -> FsOpsResult<&str> {
    let name = path.file_name().ok_or_else(|| FsOpsError::InvalidInput {
        field: "path",
        reason: "missing_file_name",
        value: Some(path.display().to_string()),
    })?;
    name.to_str().ok_or_else(|| FsOpsError::InvalidInput {
        field: "path",
        reason: "non_utf8_file_name",
        value: Some(name.to_string_lossy().into_owned()),
    })
}

fn upload_tags(settings: &AppSettings) -> Option<ObjectTags> {
    settings
        .tag()
        .map(|(name, value)| ObjectTags::from([(name.to_string(), value.to_string())]))
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    operation: &'static str,
    future: F,
) -> FsOpsResult<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FsOpsError::Cancelled { operation }),
        output = future => Ok(output),
    }
}

async fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

async fn move_to_duplicates(path: &Path, folder: &Path) -> FsOpsResult<PathBuf> {
    fs::create_dir_all(folder)
        .await
        .map_err(|err| FsOpsError::io("duplicate.create_dir", folder, err))?;
    let file_name = object_key(path)?;
    let destination = free_destination(folder, file_name, Utc::now()).await?;
    move_file(path, &destination).await?;
    Ok(destination)
}

/// First free name for `file_name` in `folder`: the name itself, then
/// `<stem>-<timestamp><ext>`, then `<stem>-<timestamp>-<n><ext>`.
async fn free_destination(
    folder: &Path,
    file_name: &str,
    now: DateTime<Utc>,
) -> FsOpsResult<PathBuf> {
    let plain = folder.join(file_name);
    if !path_taken(&plain).await? {
        return Ok(plain);
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map_or_else(|| file_name.to_string(), |stem| stem.to_string_lossy().into_owned());
    let extension = name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let stamp = now.format(DUPLICATE_STAMP_FORMAT);

    let stamped = folder.join(format!("{stem}-{stamp}{extension}"));
    if !path_taken(&stamped).await? {
        return Ok(stamped);
    }

    let mut counter: u32 = 1;
    loop {
        let candidate = folder.join(format!("{stem}-{stamp}-{counter}{extension}"));
        if !path_taken(&candidate).await? {
            return Ok(candidate);
        }
        counter = counter.saturating_add(1);
    }
}

async fn path_taken(path: &Path) -> FsOpsResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|err| FsOpsError::io("duplicate.exists", path, err))
}

async fn move_file(source: &Path, destination: &Path) -> FsOpsResult<()> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            debug!(
                file = %source.display(),
                destination = %destination.display(),
                "rename crosses devices; copying instead"
            );
            copy_then_remove(source, destination).await
        }
        Err(err) => Err(FsOpsError::io("duplicate.rename", source, err)),
    }
}

/// Copy `source` to `destination`, then remove `source`. When the source
/// cannot be removed the copy is deleted so the file exists only once.
async fn copy_then_remove(source: &Path, destination: &Path) -> FsOpsResult<()> {
    fs::copy(source, destination)
        .await
        .map_err(|err| FsOpsError::io("duplicate.copy", destination, err))?;
    if let Err(err) = fs::remove_file(source).await {
        if let Err(cleanup) = fs::remove_file(destination).await {
            warn!(
                file = %destination.display(),
                error = %cleanup,
                "failed to remove copied duplicate"
            );
        }
        return Err(FsOpsError::io("duplicate.remove_source", source, err));
    }
    Ok(())
}
