//! Application state shared across handlers.

use crate::ingest::IngestionService;
use crate::resolve::ResolutionService;
use sitehost_core::config::AppConfig;
use sitehost_metadata::SiteStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Site store.
    pub store: Arc<dyn SiteStore>,
    /// Archive ingestion pipeline.
    pub ingestion: Arc<IngestionService>,
    /// Host and path resolution pipeline.
    pub resolution: Arc<ResolutionService>,
}

impl AppState {
    /// Create a new application state; both services share `store`.
    pub fn new(config: AppConfig, store: Arc<dyn SiteStore>) -> Self {
        Self {
            config: Arc::new(config),
            ingestion: Arc::new(IngestionService::new(store.clone())),
            resolution: Arc::new(ResolutionService::new(store.clone())),
            store,
        }
    }
}
