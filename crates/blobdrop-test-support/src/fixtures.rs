//! Temporary source-folder fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blobdrop_config::AppSettings;
use tempfile::TempDir;

/// Watched folder inside a temporary directory that is removed on drop.
pub struct SourceFolder {
    _temp: TempDir,
    root: PathBuf,
}

impl SourceFolder {
    /// Create an empty `inbox` folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("blobdrop-")
            .tempdir()
            .context("failed to create temporary directory")?;
        let root = temp.path().join("inbox");
        fs::create_dir(&root)
            .with_context(|| format!("failed to create source folder {}", root.display()))?;
        Ok(Self { _temp: temp, root })
    }

    /// Path of the watched folder.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `name` inside the watched folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, content)
            .with_context(|| format!("failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    /// Names of the regular files directly inside `relative` (empty for the root), sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be listed.
    pub fn file_names_in(&self, relative: &str) -> Result<Vec<String>> {
        let dir = self.root.join(relative);
        let mut names = Vec::new();
        for entry in
            fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Names of the regular files directly inside the watched folder, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be listed.
    pub fn file_names(&self) -> Result<Vec<String>> {
        self.file_names_in("")
    }

    /// Default app settings pointing at this folder.
    #[must_use]
    pub fn app_settings(&self) -> AppSettings {
        AppSettings::for_folder(&self.root)
    }
}
