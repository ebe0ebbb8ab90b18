use std::sync::Arc;

use anyhow::Result;
use blobdrop_app::{CycleReport, PollingService};
use blobdrop_config::{AppSettings, StaticSettings};
use blobdrop_fsops::{FileProcessor, GlobScanner};
use blobdrop_storage::StorageGateway;
use blobdrop_test_support::{MemoryBlobBackend, SourceFolder};
use tokio_util::sync::CancellationToken;

type Service = PollingService<GlobScanner, StorageGateway<MemoryBlobBackend>>;

fn service(settings: AppSettings, backend: &Arc<MemoryBlobBackend>) -> Service {
    PollingService::new(
        Arc::new(StaticSettings::new(settings)),
        GlobScanner,
        FileProcessor::new(Arc::new(StorageGateway::new(Arc::clone(backend)))),
    )
}

#[tokio::test]
async fn new_files_are_uploaded_and_removed() -> Result<()> {
    let folder = SourceFolder::new()?;
    folder.write("a.pdf", b"alpha")?;
    folder.write("b.pdf", b"beta")?;
    folder.write("notes.txt", b"ignored")?;
    let settings = folder.app_settings();
    let backend = Arc::new(MemoryBlobBackend::new("uploads"));
    let service = service(settings.clone(), &backend);

    let report = service.run_cycle(&settings, &CancellationToken::new()).await?;

    assert_eq!(
        report,
        CycleReport {
            found: 2,
            uploaded: 2,
            deleted: 2,
            duplicated: 0,
            failed: 0,
        }
    );
    assert_eq!(backend.keys(), vec!["a.pdf".to_string(), "b.pdf".to_string()]);
    assert_eq!(
        backend.object("b.pdf").map(|object| object.content),
        Some(b"beta".to_vec())
    );
    assert_eq!(folder.file_names()?, vec!["notes.txt"]);
    assert_eq!(backend.create_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn second_cycle_after_upload_finds_nothing() -> Result<()> {
    let folder = SourceFolder::new()?;
    folder.write("a.pdf", b"alpha")?;
    let settings = folder.app_settings();
    let backend = Arc::new(MemoryBlobBackend::new("uploads"));
    let service = service(settings.clone(), &backend);
    let cancel = CancellationToken::new();

    let first = service.run_cycle(&settings, &cancel).await?;
    let second = service.run_cycle(&settings, &cancel).await?;

    assert_eq!(first.uploaded, 1);
    assert_eq!(second, CycleReport::default());
    assert_eq!(backend.put_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn existing_key_moves_file_to_duplicate_folder() -> Result<()> {
    let folder = SourceFolder::new()?;
    folder.write("a.pdf", b"second copy")?;
    let settings = folder.app_settings();
    let backend = Arc::new(MemoryBlobBackend::new("uploads"));
    backend.insert("a.pdf", b"first copy");
    let service = service(settings.clone(), &backend);

    let report = service.run_cycle(&settings, &CancellationToken::new()).await?;

    assert_eq!(
        report,
        CycleReport {
            found: 1,
            uploaded: 0,
            deleted: 0,
            duplicated: 1,
            failed: 0,
        }
    );
    assert!(folder.file_names()?.is_empty());
    assert_eq!(folder.file_names_in("duplicate")?, vec!["a.pdf"]);
    assert_eq!(
        std::fs::read(settings.duplicate_folder().join("a.pdf"))?,
        b"second copy"
    );
    assert_eq!(
        backend.object("a.pdf").map(|object| object.content),
        Some(b"first copy".to_vec())
    );
    assert_eq!(backend.put_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn failing_file_does_not_stop_the_batch() -> Result<()> {
    let folder = SourceFolder::new()?;
    folder.write("a.pdf", b"alpha")?;
    folder.write("bad.pdf", b"broken")?;
    folder.write("c.pdf", b"gamma")?;
    let settings = folder.app_settings();
    let backend = Arc::new(MemoryBlobBackend::new("uploads"));
    backend.fail_key("bad.pdf");
    let service = service(settings.clone(), &backend);

    let report = service.run_cycle(&settings, &CancellationToken::new()).await?;

    assert_eq!(
        report,
        CycleReport {
            found: 3,
            uploaded: 2,
            deleted: 2,
            duplicated: 0,
            failed: 1,
        }
    );
    assert_eq!(folder.file_names()?, vec!["bad.pdf"]);
    assert_eq!(backend.keys(), vec!["a.pdf".to_string(), "c.pdf".to_string()]);
    Ok(())
}

#[tokio::test]
async fn failed_container_creation_is_retried_next_cycle() -> Result<()> {
    let folder = SourceFolder::new()?;
    folder.write("a.pdf", b"alpha")?;
    let settings = folder.app_settings();
    let backend = Arc::new(MemoryBlobBackend::new("uploads"));
    backend.fail_next_creates(1);
    let service = service(settings.clone(), &backend);
    let cancel = CancellationToken::new();

    let first = service.run_cycle(&settings, &cancel).await?;
    assert_eq!(first.failed, 1);
    assert_eq!(folder.file_names()?, vec!["a.pdf"]);

    let second = service.run_cycle(&settings, &cancel).await?;
    assert_eq!(second.uploaded, 1);
    assert_eq!(backend.create_calls(), 1);
    assert!(folder.file_names()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn kept_files_are_reported_as_duplicates_next_cycle() -> Result<()> {
    let folder = SourceFolder::new()?;
    folder.write("a.pdf", b"alpha")?;
    let mut settings = folder.app_settings();
    settings.delete_after_upload = false;
    settings.tag_name = Some("source".to_string());
    settings.tag_value = Some("scanner".to_string());
    let backend = Arc::new(MemoryBlobBackend::new("uploads"));
    let service = service(settings.clone(), &backend);
    let cancel = CancellationToken::new();

    let first = service.run_cycle(&settings, &cancel).await?;
    assert_eq!((first.uploaded, first.deleted), (1, 0));
    let tags = backend.object("a.pdf").map(|object| object.tags).unwrap_or_default();
    assert_eq!(tags.get("source").map(String::as_str), Some("scanner"));

    let second = service.run_cycle(&settings, &cancel).await?;
    assert_eq!((second.found, second.duplicated), (1, 1));
    assert_eq!(folder.file_names_in("duplicate")?, vec!["a.pdf"]);
    Ok(())
}
