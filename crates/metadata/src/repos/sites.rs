//! Site repository.

use crate::error::MetadataResult;
use crate::models::SiteRow;
use async_trait::async_trait;
use sitehost_core::Hostname;
use uuid::Uuid;

/// Repository for site lookups.
///
/// Sites are only ever written through an [`UploadRepo`](super::UploadRepo)
/// unit of work.
#[async_trait]
pub trait SiteRepo: Send + Sync {
    /// Get a site by ID.
    async fn get_site(&self, site_id: Uuid) -> MetadataResult<Option<SiteRow>>;

    /// Get a site by its normalized hostname.
    async fn get_site_by_hostname(&self, hostname: &Hostname) -> MetadataResult<Option<SiteRow>>;

    /// List all sites ordered by hostname.
    async fn list_sites(&self) -> MetadataResult<Vec<SiteRow>>;
}
