//! Resolution: (hostname, request path) to stored file.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use bytes::Bytes;
use sitehost_core::media::media_type_for_path;
use sitehost_core::{ContentHash, Hostname, SitePath};
use sitehost_metadata::SiteStore;
use sitehost_metadata::models::FileRow;
use std::sync::Arc;
use time::OffsetDateTime;

/// A stored file ready to be served.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    /// Logical path that matched.
    pub path: SitePath,
    /// File content.
    pub content: Bytes,
    /// Media type inferred from `path`.
    pub media_type: &'static str,
    /// Last update of the owning site.
    pub last_modified: OffsetDateTime,
    /// Strong entity tag derived from the content hash.
    pub etag: String,
}

/// Read-only lookup of site files.
pub struct ResolutionService {
    store: Arc<dyn SiteStore>,
}

impl ResolutionService {
    pub fn new(store: Arc<dyn SiteStore>) -> Self {
        Self { store }
    }

    /// Resolve a request to a stored file.
    ///
    /// Looks up `path` verbatim, then its directory form when `path` has no
    /// trailing slash, so `/docs` finds `docs/index.html`.
    pub async fn resolve(&self, hostname: &Hostname, path: &SitePath) -> ApiResult<ResolvedFile> {
        let result = self.lookup(hostname, path).await;
        let outcome = match &result {
            Ok(_) => "hit",
            Err(ApiError::NotFound(_)) => "miss",
            Err(_) => "error",
        };
        metrics::RESOLUTIONS.with_label_values(&[outcome]).inc();
        result
    }

    async fn lookup(&self, hostname: &Hostname, path: &SitePath) -> ApiResult<ResolvedFile> {
        let site = self
            .store
            .get_site_by_hostname(hostname)
            .await?
            .ok_or_else(|| ApiError::NotFound("unknown host".to_string()))?;

        let (matched, row) = match self.store.get_file(site.site_id, path.as_str()).await? {
            Some(row) => (path.clone(), row),
            None => {
                let Some(directory) = path.directory_form() else {
                    return Err(ApiError::NotFound("file not found".to_string()));
                };
                match self.store.get_file(site.site_id, directory.as_str()).await? {
                    Some(row) => (directory, row),
                    None => return Err(ApiError::NotFound("file not found".to_string())),
                }
            }
        };

        tracing::debug!(
            hostname = %hostname,
            request_path = %path,
            path = %matched,
            size = row.size_bytes,
            "Resolved file"
        );

        Ok(Self::build_resolved(matched, row))
    }

    fn build_resolved(path: SitePath, row: FileRow) -> ResolvedFile {
        let hash = ContentHash::from_hex(&row.content_hash)
            .unwrap_or_else(|| ContentHash::compute(&row.blob));
        ResolvedFile {
            media_type: media_type_for_path(path.as_str()),
            etag: hash.etag(),
            last_modified: row.site_updated_at,
            content: Bytes::from(row.blob),
            path,
        }
    }
}
