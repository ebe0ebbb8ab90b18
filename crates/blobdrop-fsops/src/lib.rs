//! Source folder scanning and per-file processing for blobdrop.
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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Layout: `scanner.rs` (glob-matched folder listing), `processor.rs`
//! (upload, duplicate and delete decisions), `model.rs` (outcomes),
//! `error.rs` (`FsOpsError`).

pub mod error;
pub mod model;
pub mod processor;
pub mod scanner;

pub use error::{FsOpsError, FsOpsResult};
pub use model::ProcessOutcome;
pub use processor::{FileProcessor, object_key};
pub use scanner::{GlobScanner, SourceScanner, compile_pattern};
