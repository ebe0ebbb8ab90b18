//! Validation helpers and parsing utilities for settings documents.
//!
//! Field parsers accept native JSON values and their string forms, since
//! environment overrides always arrive as strings.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppSettings, Settings};

type Section<'a> = Option<&'a Map<String, Value>>;

/// Build typed settings from a merged document whose keys are lowercase.
///
/// # Errors
///
/// Returns an error when a section is not an object or a field has the wrong type.
#[allow(clippy::redundant_pub_crate)]
pub(crate) fn settings_from_tree(root: &Map<String, Value>) -> ConfigResult<Settings> {
    let mut settings = Settings::default();

    let app = section(root, "app", "App")?;
    if let Some(text) = string_field(app, "sourcefolder", "App", "SourceFolder")? {
        settings.app.source_folder = PathBuf::from(text.trim());
    }
    if let Some(text) = string_field(app, "searchpattern", "App", "SearchPattern")? {
        settings.app.search_pattern = text;
    }
    if let Some(flag) = bool_field(app, "deleteafterupload", "App", "DeleteAfterUpload")? {
        settings.app.delete_after_upload = flag;
    }
    settings.app.tag_name = string_field(app, "tagname", "App", "TagName")?;
    settings.app.tag_value = string_field(app, "tagvalue", "App", "TagValue")?;
    if let Some(seconds) = seconds_field(
        app,
        "pollingintervalseconds",
        "App",
        "PollingIntervalSeconds",
    )? {
        settings.app.polling_interval_seconds = seconds;
    }
    if let Some(text) = string_field(app, "duplicatefoldername", "App", "DuplicateFolderName")? {
        settings.app.duplicate_folder_name = text;
    }

    let blob = section(root, "blob", "Blob")?;
    if let Some(text) = string_field(blob, "connectionstring", "Blob", "ConnectionString")? {
        settings.blob.connection_string = text.trim().to_string();
    }
    if let Some(text) = string_field(blob, "containername", "Blob", "ContainerName")? {
        settings.blob.container_name = text.trim().to_string();
    }

    let logging = section(root, "logging", "Logging")?;
    if let Some(text) = string_field(logging, "level", "Logging", "Level")?
        && !text.trim().is_empty()
    {
        settings.logging.level = text.trim().to_string();
    }
    if let Some(text) = string_field(logging, "format", "Logging", "Format")?
        && !text.trim().is_empty()
    {
        settings.logging.format = Some(text.parse()?);
    }

    Ok(settings)
}

/// Collect every fatal problem that must stop the agent before its first cycle.
///
/// Each problem maps to a distinct error variant so callers can report them separately.
#[must_use]
pub fn startup_errors(settings: &Settings) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    if settings.app.source_folder_is_unset() {
        errors.push(ConfigError::MissingSourceFolder);
    } else if !settings.app.source_folder.is_dir() {
        errors.push(ConfigError::SourceFolderNotFound {
            path: settings.app.source_folder.clone(),
        });
    }
    if settings.blob.connection_string.trim().is_empty() {
        errors.push(ConfigError::MissingConnectionString);
    }
    if settings.blob.container_name.trim().is_empty() {
        errors.push(ConfigError::MissingContainerName);
    }
    errors
}

/// Check that reloaded per-cycle settings are still usable.
///
/// # Errors
///
/// Returns `ConfigError::MissingSourceFolder` when the folder setting was cleared.
pub fn reloaded_app(app: &AppSettings) -> ConfigResult<()> {
    if app.source_folder_is_unset() {
        return Err(ConfigError::MissingSourceFolder);
    }
    Ok(())
}

fn section<'a>(
    root: &'a Map<String, Value>,
    key: &str,
    name: &'static str,
) -> ConfigResult<Section<'a>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(ConfigError::invalid_field(
            name,
            "",
            Some(other.to_string()),
            "must_be_object",
        )),
    }
}

fn string_field(
    section: Section<'_>,
    key: &str,
    name: &'static str,
    field: &'static str,
) -> ConfigResult<Option<String>> {
    section
        .and_then(|map| map.get(key))
        .map_or(Ok(None), |value| parse_string(value, name, field))
}

fn bool_field(
    section: Section<'_>,
    key: &str,
    name: &'static str,
    field: &'static str,
) -> ConfigResult<Option<bool>> {
    section
        .and_then(|map| map.get(key))
        .map_or(Ok(None), |value| parse_bool(value, name, field))
}

fn seconds_field(
    section: Section<'_>,
    key: &str,
    name: &'static str,
    field: &'static str,
) -> ConfigResult<Option<u64>> {
    section
        .and_then(|map| map.get(key))
        .map_or(Ok(None), |value| parse_seconds(value, name, field))
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_string(
    value: &Value,
    section: &'static str,
    field: &'static str,
) -> ConfigResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Array(_) | Value::Object(_) => Err(ConfigError::invalid_field(
            section,
            field,
            Some(value.to_string()),
            "must_be_string",
        )),
    }
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_bool(
    value: &Value,
    section: &'static str,
    field: &'static str,
) -> ConfigResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(*flag)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(ConfigError::invalid_field(
                section,
                field,
                Some(text.clone()),
                "must_be_boolean",
            )),
        },
        other => Err(ConfigError::invalid_field(
            section,
            field,
            Some(other.to_string()),
            "must_be_boolean",
        )),
    }
}

/// Negative values clamp to zero; the one-second floor is applied at use time.
#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_seconds(
    value: &Value,
    section: &'static str,
    field: &'static str,
) -> ConfigResult<Option<u64>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::String(text) if text.trim().is_empty() => return Ok(None),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|big| i64::try_from(big).unwrap_or(i64::MAX))),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };
    let seconds = parsed.ok_or_else(|| {
        ConfigError::invalid_field(section, field, Some(value.to_string()), "must_be_integer")
    })?;
    Ok(Some(u64::try_from(seconds).unwrap_or(0)))
}
