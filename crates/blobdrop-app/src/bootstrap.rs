use std::future::Future;
use std::sync::Arc;

use blobdrop_config::{
    AppSettings, AppSettingsSource, BlobSettings, ConfigLoader, LogFormatPreference,
    LoggingSettings, SettingsWatcher, validate,
};
use blobdrop_fsops::{FileProcessor, GlobScanner, SourceScanner};
use blobdrop_storage::{AzureBlobBackend, BlobStore, StorageGateway};
use blobdrop_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, init_logging};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::poller::PollingService;

/// Entry point for the blobdrop agent.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded or fail startup validation,
/// logging cannot be installed, the storage backend cannot be built, or the
/// polling task fails to join.
pub async fn run_app() -> AppResult<()> {
    let loader = ConfigLoader::from_env();
    let settings = match loader.load().await {
        Ok(settings) => settings,
        Err(err) => {
            init_logging(&LoggingConfig::default())
                .map_err(|source| AppError::telemetry("telemetry.init", source))?;
            error!(
                config_dir = %loader.directory().display(),
                error = ?err,
                "failed to load settings"
            );
            return Err(AppError::config("config.load", err));
        }
    };

    init_logging(&logging_config(&settings.logging))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!(
        config_dir = %loader.directory().display(),
        "blobdrop agent starting"
    );

    let problems = validate::startup_errors(&settings);
    if !problems.is_empty() {
        for problem in &problems {
            error!(error = ?problem, "{problem}");
        }
        return Err(AppError::InvalidConfiguration {
            count: problems.len(),
        });
    }
    if tag_half_configured(&settings.app) {
        warn!("only one of App.TagName and App.TagValue is set; uploads will not be tagged");
    }

    let backend = storage_backend(&settings.blob)?;
    let gateway = Arc::new(StorageGateway::new(Arc::new(backend)));
    info!(
        container = %settings.blob.container_name,
        folder = %settings.app.source_folder().display(),
        pattern = settings.app.search_pattern(),
        "storage and source folder configured"
    );

    let watcher: Arc<dyn AppSettingsSource> =
        Arc::new(SettingsWatcher::new(loader, settings.app.clone()));
    let service = PollingService::new(watcher, GlobScanner, FileProcessor::new(gateway));

    blobdrop_telemetry::record_app_mode("running");
    run_until_shutdown(service, shutdown_signal()).await
}

/// Run `service` on its own task until `shutdown` resolves, then cancel and join it.
///
/// # Errors
///
/// Returns an error if the polling task panicked.
pub async fn run_until_shutdown<Sc, S>(
    service: PollingService<Sc, S>,
    shutdown: impl Future<Output = ()>,
) -> AppResult<()>
where
    Sc: SourceScanner + 'static,
    S: BlobStore + 'static,
{
    let cancel = CancellationToken::new();
    let worker = tokio::spawn({
        let cancel = cancel.clone();
        async move { service.run(cancel).await }
    });

    shutdown.await;
    info!("shutdown requested; stopping polling loop");
    cancel.cancel();

    worker.await.map_err(|source| AppError::TaskJoin {
        operation: "poller.join",
        source,
    })?;
    info!("blobdrop agent stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => on_ctrl_c(result).await,
                    _ = sigterm.recv() => info!("received SIGTERM"),
                }
                return;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    }
    on_ctrl_c(tokio::signal::ctrl_c().await).await;
}

async fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("received Ctrl-C"),
        Err(err) => {
            warn!(error = %err, "failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

fn storage_backend(blob: &BlobSettings) -> AppResult<AzureBlobBackend> {
    AzureBlobBackend::from_connection_string(&blob.connection_string, blob.container_name.clone())
        .map_err(|err| {
            error!(
                container = %blob.container_name,
                error = ?err,
                "invalid blob storage connection string"
            );
            AppError::storage("storage.connect", err)
        })
}

fn logging_config(settings: &LoggingSettings) -> LoggingConfig<'_> {
    let format = match settings.format {
        Some(LogFormatPreference::Json) => LogFormat::Json,
        Some(LogFormatPreference::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    };
    LoggingConfig {
        level: &settings.level,
        format,
        ..LoggingConfig::default()
    }
}

fn tag_half_configured(app: &AppSettings) -> bool {
    let is_set = |value: Option<&str>| value.is_some_and(|value| !value.trim().is_empty());
    is_set(app.tag_name.as_deref()) != is_set(app.tag_value.as_deref())
}
