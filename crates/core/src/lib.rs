//! Core domain types and shared logic for sitehost.
//!
//! This crate defines the pieces of the static-site host that do no I/O of
//! their own:
//! - Archive extraction (gzip-compressed tar to logical file entries)
//! - Logical path normalization for archive entries and request paths
//! - Hostname normalization for uploads and `Host` headers
//! - Media type inference from file extensions
//! - Content hashing for change detection
//! - Configuration shared by the store and the server

pub mod archive;
pub mod config;
pub mod error;
pub mod hash;
pub mod host;
pub mod media;
pub mod site_path;

pub use archive::{ArchiveEntries, ArchiveEntry, ArchiveExtractor};
pub use error::{Error, Result};
pub use hash::ContentHash;
pub use host::Hostname;
pub use site_path::SitePath;

/// Default upload body limit: 64 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Base name of the directory index file.
pub const INDEX_FILE: &str = "index.html";
