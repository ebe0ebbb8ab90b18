//! Default values and well-known names for blobdrop settings.
//!
//! # Design
//! - Centralize defaults so loading, validation and use sites agree.
//! - Keep environment variable names next to the values they select.

/// Glob applied when `App.SearchPattern` is blank.
pub const DEFAULT_SEARCH_PATTERN: &str = "*.pdf";
/// Whether uploaded files are removed locally unless configured otherwise.
pub const DEFAULT_DELETE_AFTER_UPLOAD: bool = true;
/// Seconds between polling cycles unless configured otherwise.
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 5;
/// Lower bound applied to the polling interval at use time.
pub const MIN_POLLING_INTERVAL_SECS: u64 = 1;
/// Sub-folder receiving files whose key already exists remotely.
pub const DEFAULT_DUPLICATE_FOLDER: &str = "duplicate";
/// Log level used when neither `RUST_LOG` nor `Logging.Level` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable naming the directory that holds the settings files.
pub const CONFIG_DIR_ENV: &str = "BLOBDROP_CONFIG_DIR";
/// Environment variable naming the environment-specific settings overlay.
pub const ENVIRONMENT_ENV: &str = "BLOBDROP_ENVIRONMENT";

pub(crate) const SETTINGS_FILE_STEM: &str = "appsettings";
pub(crate) const ENV_SECTION_SEPARATOR: &str = "__";
