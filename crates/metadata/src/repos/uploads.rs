//! Site upload unit of work.

use crate::error::MetadataResult;
use crate::models::UploadReceipt;
use async_trait::async_trait;
use sitehost_core::{Hostname, SitePath};
use time::OffsetDateTime;

/// Repository that opens site uploads.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Open a unit of work for a site upload.
    ///
    /// Upserts the site row for `hostname` inside a new transaction: the
    /// site is inserted if absent, otherwise its `updated_at` is set to
    /// `now`. Nothing is visible to readers until
    /// [`SiteUpload::commit`] succeeds.
    async fn begin_site_upload(
        &self,
        hostname: &Hostname,
        now: OffsetDateTime,
    ) -> MetadataResult<Box<dyn SiteUpload>>;
}

/// An open, all-or-nothing site upload.
///
/// Dropping an upload without committing rolls it back, which is what
/// happens when the request task is cancelled.
#[async_trait]
pub trait SiteUpload: Send {
    /// Insert or replace the file at `path`.
    ///
    /// Replaces content, hash, size and timestamp of an existing row for the
    /// same (site, path); never creates a duplicate.
    async fn upsert_file(&mut self, path: &SitePath, content: &[u8]) -> MetadataResult<()>;

    /// Commit every change made through this upload.
    async fn commit(self: Box<Self>) -> MetadataResult<UploadReceipt>;

    /// Discard every change made through this upload.
    async fn rollback(self: Box<Self>) -> MetadataResult<()>;
}
