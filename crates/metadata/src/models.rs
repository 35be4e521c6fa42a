//! Database models mapping to the site schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A published site, keyed by hostname.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SiteRow {
    pub site_id: Uuid,
    /// Lowercased hostname; unique across all sites.
    pub hostname: String,
    pub created_at: OffsetDateTime,
    /// Time of the most recent committed upload.
    pub updated_at: OffsetDateTime,
}

/// A stored file including its content.
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct FileRow {
    pub file_id: Uuid,
    pub site_id: Uuid,
    /// Logical path, always beginning with `/`.
    pub path: String,
    /// SHA-256 of `blob`, lowercase hex.
    pub content_hash: String,
    pub size_bytes: i64,
    pub blob: Vec<u8>,
    pub updated_at: OffsetDateTime,
    /// `updated_at` of the owning site, read in the same statement.
    pub site_updated_at: OffsetDateTime,
}

impl std::fmt::Debug for FileRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRow")
            .field("file_id", &self.file_id)
            .field("site_id", &self.site_id)
            .field("path", &self.path)
            .field("content_hash", &self.content_hash)
            .field("size_bytes", &self.size_bytes)
            .field("updated_at", &self.updated_at)
            .field("site_updated_at", &self.site_updated_at)
            .finish_non_exhaustive()
    }
}

/// A stored file without its content, for listings.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileInfoRow {
    pub file_id: Uuid,
    pub site_id: Uuid,
    pub path: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub updated_at: OffsetDateTime,
}

/// Result of a committed site upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// The site row as written by the upload.
    pub site: SiteRow,
    /// Number of file upserts executed, including repeated paths.
    pub files_written: u64,
}
