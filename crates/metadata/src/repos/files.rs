//! Stored file repository.

use crate::error::MetadataResult;
use crate::models::{FileInfoRow, FileRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for stored file lookups.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// Get a file, including its content, by exact logical path.
    ///
    /// The owning site's `updated_at` comes from the same statement, so it
    /// always belongs to the upload that wrote the returned content.
    async fn get_file(&self, site_id: Uuid, path: &str) -> MetadataResult<Option<FileRow>>;

    /// List a site's files without content, ordered by path.
    async fn list_files(&self, site_id: Uuid) -> MetadataResult<Vec<FileInfoRow>>;

    /// Count a site's files.
    async fn count_files(&self, site_id: Uuid) -> MetadataResult<u64>;
}
