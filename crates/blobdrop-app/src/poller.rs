//! Scan, process and sleep, until cancelled.
//!
//! # Design
//! - Settings are re-read at the start of every cycle.
//! - Files are handled one at a time; a failing file is logged and counted, and
//!   the rest of the batch still runs.
//! - Cycle-level failures (folder creation, scanning) end the cycle early but
//!   never the loop.
//! - The inter-cycle sleep races the cancellation token.

use std::sync::Arc;

use blobdrop_config::{AppSettings, AppSettingsSource};
use blobdrop_fsops::{FileProcessor, ProcessOutcome, SourceScanner};
use blobdrop_storage::BlobStore;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{AppError, AppResult};

/// Counters for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Files matched by the scan.
    pub found: usize,
    /// Files uploaded.
    pub uploaded: usize,
    /// Local files deleted after upload.
    pub deleted: usize,
    /// Files moved to the duplicate folder.
    pub duplicated: usize,
    /// Files whose processing failed.
    pub failed: usize,
}

impl CycleReport {
    const fn record(&mut self, outcome: ProcessOutcome) {
        if outcome.is_uploaded() {
            self.uploaded += 1;
        }
        if outcome.is_deleted() {
            self.deleted += 1;
        }
        if outcome.is_duplicated() {
            self.duplicated += 1;
        }
    }

    fn log(&self) {
        info!(count = self.found, "files found");
        info!(count = self.uploaded, "files uploaded");
        info!(count = self.deleted, "files deleted");
        info!(count = self.duplicated, "files moved to duplicate folder");
        info!(count = self.failed, "files failed");
    }
}

/// The long-running polling loop.
pub struct PollingService<Sc, S> {
    settings: Arc<dyn AppSettingsSource>,
    scanner: Sc,
    processor: FileProcessor<S>,
}

impl<Sc: SourceScanner, S: BlobStore> PollingService<Sc, S> {
    /// Compose a loop from its settings source, scanner and processor.
    #[must_use]
    pub fn new(
        settings: Arc<dyn AppSettingsSource>,
        scanner: Sc,
        processor: FileProcessor<S>,
    ) -> Self {
        Self {
            settings,
            scanner,
            processor,
        }
    }

    /// Run cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("polling loop started");
        while !cancel.is_cancelled() {
            let settings = self.settings.current().await;
            match self.run_cycle(&settings, &cancel).await {
                Ok(report) => report.log(),
                Err(err) if err.is_cancelled() => break,
                Err(err) => error!(
                    folder = %settings.source_folder().display(),
                    error = ?err,
                    "polling cycle failed"
                ),
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(settings.polling_interval()) => {}
            }
        }
    }

    /// Run a single cycle against `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error when the source folder cannot be created or scanned,
    /// or when `cancel` fires while a file is being processed. Per-file
    /// failures are logged and counted instead.
    pub async fn run_cycle(
        &self,
        settings: &AppSettings,
        cancel: &CancellationToken,
    ) -> AppResult<CycleReport> {
        let folder = settings.source_folder();
        fs::create_dir_all(folder)
            .await
            .map_err(|source| AppError::io("poller.create_source_folder", folder, source))?;
        let files = self
            .scanner
            .scan(folder, settings.search_pattern())
            .map_err(|source| AppError::fsops("poller.scan", source))?;

        let mut report = CycleReport {
            found: files.len(),
            ..CycleReport::default()
        };
        for path in &files {
            match self.processor.process(path, settings, cancel).await {
                Ok(outcome) => report.record(outcome),
                Err(err) if err.is_cancelled() => {
                    return Err(AppError::fsops("poller.process", err));
                }
                Err(err) => {
                    report.failed += 1;
                    error!(file = %path.display(), error = ?err, "failed to process file");
                }
            }
        }
        Ok(report)
    }
}
