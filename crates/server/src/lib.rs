//! HTTP server for sitehost.
//!
//! This crate provides the two request pipelines:
//! - Ingestion: `POST /upload` turns a `.tar.gz` archive into a site
//! - Resolution: any other request is served from the site named by `Host`

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod resolve;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use ingest::{IngestionService, SiteSummary, UploadedArchive};
pub use resolve::{ResolutionService, ResolvedFile};
pub use routes::create_router;
pub use state::AppState;
