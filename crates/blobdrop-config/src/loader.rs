//! Layered settings loader.
//!
//! # Design
//! - Merge `appsettings.json`, then `appsettings.{Environment}.json`, then
//!   environment variables using `__` as the section separator.
//! - Lowercase every key while merging so lookups are case-insensitive.
//! - Missing files are skipped; unreadable or malformed files are errors.
//! - The environment source is injectable so tests never touch process state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::defaults::{CONFIG_DIR_ENV, ENV_SECTION_SEPARATOR, ENVIRONMENT_ENV, SETTINGS_FILE_STEM};
use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;
use crate::validate::settings_from_tree;

/// Loads [`Settings`] from JSON files and environment overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    directory: PathBuf,
    environment: Option<String>,
    env_vars: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Loader reading the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_env_vars(std::env::vars_os().filter_map(|(name, value)| {
            Some((name.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// Loader reading the supplied variables instead of the process environment.
    #[must_use]
    pub fn with_env_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let env_vars: Vec<(String, String)> = vars.into_iter().collect();
        let directory = lookup(&env_vars, CONFIG_DIR_ENV)
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        let environment = lookup(&env_vars, ENVIRONMENT_ENV).map(str::to_string);
        Self {
            directory,
            environment,
            env_vars,
        }
    }

    /// Override the directory holding the settings files.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Directory holding the settings files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Settings files in merge order.
    #[must_use]
    pub fn settings_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.directory.join(format!("{SETTINGS_FILE_STEM}.json"))];
        if let Some(environment) = &self.environment {
            files.push(
                self.directory
                    .join(format!("{SETTINGS_FILE_STEM}.{environment}.json")),
            );
        }
        files
    }

    /// Load and merge every source into typed settings.
    ///
    /// # Errors
    ///
    /// Returns an error when a present settings file cannot be read or parsed,
    /// or when a field holds a value of the wrong type.
    pub async fn load(&self) -> ConfigResult<Settings> {
        let mut root = Map::new();
        for path in self.settings_files() {
            if let Some(document) = read_document(&path).await? {
                merge(&mut root, document);
            }
        }
        apply_env_overrides(&mut root, &self.env_vars);
        settings_from_tree(&root)
    }
}

fn lookup<'a>(vars: &'a [(String, String)], name: &str) -> Option<&'a str> {
    vars.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

async fn read_document(path: &Path) -> ConfigResult<Option<Map<String, Value>>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file not present; skipping");
            return Ok(None);
        }
        Err(err) => return Err(ConfigError::io("config.read", path, err)),
    };

    let value: Value = serde_json::from_slice(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match lowercase_keys(value) {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(ConfigError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "root_must_be_object",
        }),
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut lowered = Map::new();
            for (key, child) in map {
                let child = lowercase_keys(child);
                match lowered.get_mut(&key.to_ascii_lowercase()) {
                    Some(existing) => merge_value(existing, child),
                    None => {
                        lowered.insert(key.to_ascii_lowercase(), child);
                    }
                }
            }
            Value::Object(lowered)
        }
        other => other,
    }
}

fn merge(target: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match target.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_value(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(existing), Value::Object(incoming)) => merge(existing, incoming),
        (slot, incoming) => *slot = incoming,
    }
}

fn apply_env_overrides(root: &mut Map<String, Value>, vars: &[(String, String)]) {
    for (name, value) in vars {
        if !name.contains(ENV_SECTION_SEPARATOR) {
            continue;
        }
        let segments: Vec<String> = name
            .split(ENV_SECTION_SEPARATOR)
            .map(str::to_ascii_lowercase)
            .collect();
        if segments.iter().any(String::is_empty) {
            continue;
        }
        insert_path(root, &segments, Value::String(value.clone()));
    }
}

fn insert_path(root: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut cursor = root;
    for segment in parents {
        let slot = cursor
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        cursor = next;
    }
    cursor.insert(last.clone(), value);
}
