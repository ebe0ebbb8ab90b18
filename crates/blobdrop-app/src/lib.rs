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
#![allow(clippy::module_name_repetitions)]

//! Blobdrop agent wiring.
//!
//! Layout: `bootstrap.rs` (settings, logging, storage and shutdown wiring),
//! `poller.rs` (the scan/process/sleep loop), `error.rs` (`AppError`).

/// Application bootstrap and shutdown handling.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// Polling loop over the watched folder.
pub mod poller;

pub use bootstrap::{run_app, run_until_shutdown, shutdown_signal};
pub use error::{AppError, AppResult};
pub use poller::{CycleReport, PollingService};
