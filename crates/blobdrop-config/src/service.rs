//! Per-cycle settings sources.
//!
//! # Design
//! - The polling loop asks for fresh app settings at the start of every cycle.
//! - A failed reload never stalls the agent: the last good settings are reused
//!   and the failure is logged as a warning.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::warn;

use crate::error::ConfigResult;
use crate::loader::ConfigLoader;
use crate::model::AppSettings;
use crate::validate;

/// Source of app settings consulted once per polling cycle.
#[async_trait]
pub trait AppSettingsSource: Send + Sync {
    /// Settings to use for the cycle that is about to start.
    async fn current(&self) -> AppSettings;
}

/// Reloads settings from disk and the environment on every request.
pub struct SettingsWatcher {
    loader: ConfigLoader,
    last_good: Mutex<AppSettings>,
}

impl SettingsWatcher {
    /// Watch `loader`, starting from the settings validated at startup.
    #[must_use]
    pub const fn new(loader: ConfigLoader, initial: AppSettings) -> Self {
        Self {
            loader,
            last_good: Mutex::new(initial),
        }
    }

    /// Reload settings, remembering them as the last good snapshot on success.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the source folder was cleared.
    pub async fn reload(&self) -> ConfigResult<AppSettings> {
        let settings = self.loader.load().await?;
        validate::reloaded_app(&settings.app)?;
        *lock(&self.last_good) = settings.app.clone();
        Ok(settings.app)
    }

    /// Most recent settings that loaded successfully.
    #[must_use]
    pub fn last_good(&self) -> AppSettings {
        lock(&self.last_good).clone()
    }
}

#[async_trait]
impl AppSettingsSource for SettingsWatcher {
    async fn current(&self) -> AppSettings {
        match self.reload().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = ?err, "failed to reload app settings; reusing last good settings");
                self.last_good()
            }
        }
    }
}

/// Fixed settings that callers may replace between cycles.
#[derive(Debug, Default)]
pub struct StaticSettings {
    settings: Mutex<AppSettings>,
}

impl StaticSettings {
    /// Serve `settings` until replaced.
    #[must_use]
    pub const fn new(settings: AppSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }

    /// Replace the served settings.
    pub fn set(&self, settings: AppSettings) {
        *lock(&self.settings) = settings;
    }
}

#[async_trait]
impl AppSettingsSource for StaticSettings {
    async fn current(&self) -> AppSettings {
        lock(&self.settings).clone()
    }
}

fn lock(mutex: &Mutex<AppSettings>) -> MutexGuard<'_, AppSettings> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::CONFIG_DIR_ENV;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn loader_for(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::with_env_vars([(
            CONFIG_DIR_ENV.to_string(),
            dir.path().display().to_string(),
        )])
    }

    #[tokio::test]
    async fn watcher_picks_up_changes_between_cycles() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let file = dir.path().join("appsettings.json");
        fs::write(&file, r#"{"App":{"SourceFolder":"/in","PollingIntervalSeconds":5}}"#)?;
        let watcher = SettingsWatcher::new(loader_for(&dir), AppSettings::default());

        assert_eq!(watcher.current().await.polling_interval_seconds, 5);
        fs::write(&file, r#"{"App":{"SourceFolder":"/in","PollingIntervalSeconds":7}}"#)?;
        assert_eq!(watcher.current().await.polling_interval_seconds, 7);
        Ok(())
    }

    #[tokio::test]
    async fn watcher_falls_back_to_last_good_on_invalid_json() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let file = dir.path().join("appsettings.json");
        fs::write(&file, r#"{"App":{"SourceFolder":"/in","TagName":"a","TagValue":"b"}}"#)?;
        let watcher = SettingsWatcher::new(loader_for(&dir), AppSettings::default());
        let first = watcher.current().await;
        assert_eq!(first.source_folder, PathBuf::from("/in"));

        fs::write(&file, r#"{"App":{"SourceFolder":"#)?;
        assert!(watcher.reload().await.is_err());
        assert_eq!(watcher.current().await, first);
        Ok(())
    }

    #[tokio::test]
    async fn watcher_rejects_cleared_source_folder() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let initial = AppSettings::for_folder("/in");
        fs::write(dir.path().join("appsettings.json"), r#"{"App":{"SourceFolder":""}}"#)?;
        let watcher = SettingsWatcher::new(loader_for(&dir), initial.clone());

        assert_eq!(watcher.current().await, initial);
        Ok(())
    }

    #[tokio::test]
    async fn static_settings_serve_replacements() {
        let source = StaticSettings::new(AppSettings::for_folder("/a"));
        assert_eq!(source.current().await.source_folder, PathBuf::from("/a"));
        source.set(AppSettings::for_folder("/b"));
        assert_eq!(source.current().await.source_folder, PathBuf::from("/b"));
    }
}
