//! Site store abstraction and implementations for sitehost.
//!
//! This crate owns the persistent data model:
//! - Sites keyed by hostname
//! - Files keyed by (site, logical path), content stored inline
//! - Upload units of work that publish a whole archive atomically

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use store::{SiteStore, SqliteStore};

use sitehost_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a site store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn SiteStore>> {
    config.validate().map_err(MetadataError::Config)?;

    match config {
        MetadataConfig::Sqlite {
            path,
            max_connections,
            ..
        } => {
            let busy_timeout = config.busy_timeout().unwrap_or_default();
            let store = SqliteStore::new(path, busy_timeout, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn SiteStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                // URL takes precedence over individual fields
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn SiteStore>)
        }
    }
}
