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

//! Shared test helpers used across blobdrop suites.
//! Layout: memory.rs (in-memory blob backend), fixtures.rs (temporary source folders).

pub mod fixtures;
pub mod memory;

pub use fixtures::SourceFolder;
pub use memory::{MemoryBlobBackend, StoredObject};
