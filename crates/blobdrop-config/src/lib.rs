#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Layered configuration for blobdrop: JSON settings files plus environment overrides.
//!
//! Layout: `defaults.rs` (default values and env names), `model.rs` (typed
//! settings), `loader.rs` (file merge and env overlay), `validate.rs` (field
//! parsing and startup checks), `service.rs` (per-cycle settings sources).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{AppSettings, BlobSettings, LogFormatPreference, LoggingSettings, Settings};
pub use service::{AppSettingsSource, SettingsWatcher, StaticSettings};
