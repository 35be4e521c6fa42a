//! Site ingestion: one uploaded archive becomes one atomic site update.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use bytes::Bytes;
use sitehost_core::media::{is_gzip, media_type_for_path};
use sitehost_core::{ArchiveEntry, ArchiveExtractor, Hostname};
use sitehost_metadata::SiteStore;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Entries buffered between the extraction worker and the store.
const ENTRY_CHANNEL_CAPACITY: usize = 8;

/// One file part of an upload form.
#[derive(Clone)]
pub struct UploadedArchive {
    /// Form field name; names the target hostname.
    pub field_name: String,
    /// File name supplied by the client.
    pub file_name: String,
    /// Archive bytes.
    pub bytes: Bytes,
}

impl std::fmt::Debug for UploadedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedArchive")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Outcome of a committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    /// Normalized hostname of the site.
    pub hostname: String,
    /// Distinct logical paths written by this upload.
    pub files: usize,
    /// Site timestamp set by this upload.
    pub updated_at: OffsetDateTime,
}

/// Turns uploaded archives into committed site contents.
pub struct IngestionService {
    store: Arc<dyn SiteStore>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn SiteStore>) -> Self {
        Self { store }
    }

    /// Validate an upload and publish its archive.
    ///
    /// Either every file of the archive becomes visible under the hostname
    /// or nothing changes.
    pub async fn ingest(&self, files: Vec<UploadedArchive>) -> ApiResult<SiteSummary> {
        let start = Instant::now();
        let result = self.validate_and_store(files).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.status_code().is_client_error() => "rejected",
            Err(_) => "failed",
        };
        metrics::UPLOADS.with_label_values(&[outcome]).inc();
        if result.is_ok() {
            metrics::UPLOAD_DURATION.observe(start.elapsed().as_secs_f64());
        }

        result
    }

    async fn validate_and_store(&self, mut files: Vec<UploadedArchive>) -> ApiResult<SiteSummary> {
        let upload = match files.len() {
            0 => return Err(ApiError::BadRequest("no file supplied".to_string())),
            1 => files.remove(0),
            n => {
                return Err(ApiError::BadRequest(format!(
                    "multiple files supplied ({n}); upload one archive per request"
                )));
            }
        };

        let media_type = media_type_for_path(&upload.file_name);
        if !is_gzip(media_type) {
            return Err(ApiError::BadRequest(format!(
                "unsupported archive type {media_type} for {:?}; expected a .tar.gz archive",
                upload.file_name
            )));
        }

        let hostname = Hostname::parse(&upload.field_name)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        self.store_archive(&hostname, upload.bytes).await
    }

    async fn store_archive(&self, hostname: &Hostname, bytes: Bytes) -> ApiResult<SiteSummary> {
        let archive_len = bytes.len();
        let mut upload = self
            .store
            .begin_site_upload(hostname, OffsetDateTime::now_utc())
            .await?;

        let (tx, mut rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
        let extraction = tokio::task::spawn_blocking(move || extract_entries(bytes, tx));

        let mut paths = BTreeSet::new();
        let mut failure = None;
        while let Some(item) = rx.recv().await {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    failure = Some(ApiError::BadRequest(format!("malformed archive: {e}")));
                    break;
                }
            };
            if let Err(e) = upload.upsert_file(&entry.path, &entry.content).await {
                failure = Some(ApiError::from(e));
                break;
            }
            tracing::debug!(
                hostname = %hostname,
                entry = %entry.raw_name,
                path = %entry.path,
                size = entry.content.len(),
                "Stored file"
            );
            paths.insert(entry.path.into_string());
        }
        // Closing the receiver stops the worker at its next send.
        drop(rx);

        if let Err(e) = extraction.await
            && failure.is_none()
        {
            failure = Some(ApiError::Internal(format!(
                "archive extraction task failed: {e}"
            )));
        }

        if let Some(err) = failure {
            tracing::warn!(
                hostname = %hostname,
                archive_bytes = archive_len,
                error = %err,
                "Upload rejected, rolling back"
            );
            if let Err(e) = upload.rollback().await {
                tracing::error!(hostname = %hostname, error = %e, "Rollback failed");
            }
            return Err(err);
        }

        let receipt = upload.commit().await?;
        metrics::FILES_STORED.inc_by(receipt.files_written);

        tracing::info!(
            hostname = %receipt.site.hostname,
            files = paths.len(),
            archive_bytes = archive_len,
            "Site uploaded"
        );

        Ok(SiteSummary {
            hostname: receipt.site.hostname,
            files: paths.len(),
            updated_at: receipt.site.updated_at,
        })
    }
}

/// Decode `bytes` on a blocking worker, sending each entry (or the first
/// error) to `tx`.
fn extract_entries(bytes: Bytes, tx: mpsc::Sender<sitehost_core::Result<ArchiveEntry>>) {
    let mut extractor = match ArchiveExtractor::new(Cursor::new(bytes)) {
        Ok(extractor) => extractor,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };
    let entries = match extractor.entries() {
        Ok(entries) => entries,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };
    for item in entries {
        if tx.blocking_send(item).is_err() {
            tracing::debug!("Upload abandoned, stopping extraction");
            return;
        }
    }
}
