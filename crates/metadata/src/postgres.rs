//! PostgreSQL-based site store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::*;
use crate::repos::{FileRepo, SiteRepo, SiteUpload, UploadRepo};
use crate::store::SiteStore;
use async_trait::async_trait;
use sitehost_core::config::PgSslMode;
use sitehost_core::{ContentHash, Hostname, SitePath};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based site store.
///
/// Open uploads are capped one below the pool size. Uploads to the same host
/// queue on the site row lock while holding a connection, and the cap keeps
/// a connection free for readers.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    upload_slots: Arc<Semaphore>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// Lets the password arrive separately, e.g. from
    /// `SITEHOST_METADATA__PASSWORD`.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let max_connections = max_connections.max(2);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            upload_slots: Arc::new(Semaphore::new(max_connections as usize - 1)),
        };
        store.migrate().await?;

        Ok(store)
    }
}

#[async_trait]
impl SiteStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements hold one statement each.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SiteRepo for PostgresStore {
    async fn get_site(&self, site_id: Uuid) -> MetadataResult<Option<SiteRow>> {
        let row = sqlx::query_as::<_, SiteRow>(
            "SELECT site_id, hostname, created_at, updated_at FROM sites WHERE site_id = $1",
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_site_by_hostname(&self, hostname: &Hostname) -> MetadataResult<Option<SiteRow>> {
        let row = sqlx::query_as::<_, SiteRow>(
            "SELECT site_id, hostname, created_at, updated_at FROM sites WHERE hostname = $1",
        )
        .bind(hostname.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_sites(&self) -> MetadataResult<Vec<SiteRow>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT site_id, hostname, created_at, updated_at FROM sites ORDER BY hostname",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl FileRepo for PostgresStore {
    async fn get_file(&self, site_id: Uuid, path: &str) -> MetadataResult<Option<FileRow>> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT f.file_id, f.site_id, f.path, f.content_hash, f.size_bytes, f.blob,
                   f.updated_at, s.updated_at AS site_updated_at
            FROM files f
            JOIN sites s ON s.site_id = f.site_id
            WHERE f.site_id = $1 AND f.path = $2
            "#,
        )
        .bind(site_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_files(&self, site_id: Uuid) -> MetadataResult<Vec<FileInfoRow>> {
        let rows = sqlx::query_as::<_, FileInfoRow>(
            r#"
            SELECT file_id, site_id, path, content_hash, size_bytes, updated_at
            FROM files
            WHERE site_id = $1
            ORDER BY path
            "#,
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_files(&self, site_id: Uuid) -> MetadataResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE site_id = $1")
            .bind(site_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl UploadRepo for PostgresStore {
    async fn begin_site_upload(
        &self,
        hostname: &Hostname,
        now: OffsetDateTime,
    ) -> MetadataResult<Box<dyn SiteUpload>> {
        let slot = self
            .upload_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| MetadataError::Internal(format!("upload slots closed: {e}")))?;
        let mut tx = self.pool.begin().await?;

        // The upsert row-locks the site until commit, so a concurrent upload
        // to the same host queues here.
        let site = sqlx::query_as::<_, SiteRow>(
            r#"
            INSERT INTO sites (site_id, hostname, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT(hostname) DO UPDATE SET updated_at = EXCLUDED.updated_at
            RETURNING site_id, hostname, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(hostname.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Ok(Box::new(PgSiteUpload {
            tx,
            site,
            files_written: 0,
            _slot: slot,
        }))
    }
}

/// Open upload transaction against PostgreSQL.
struct PgSiteUpload {
    tx: Transaction<'static, Postgres>,
    site: SiteRow,
    files_written: u64,
    _slot: OwnedSemaphorePermit,
}

#[async_trait]
impl SiteUpload for PgSiteUpload {
    async fn upsert_file(&mut self, path: &SitePath, content: &[u8]) -> MetadataResult<()> {
        let size_bytes = i64::try_from(content.len())
            .map_err(|_| MetadataError::Internal(format!("file too large to store: {path}")))?;
        let content_hash = ContentHash::compute(content).to_hex();

        sqlx::query(
            r#"
            INSERT INTO files (file_id, site_id, path, content_hash, size_bytes, blob, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(site_id, path) DO UPDATE SET
                content_hash = EXCLUDED.content_hash,
                size_bytes = EXCLUDED.size_bytes,
                blob = EXCLUDED.blob,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(self.site.site_id)
        .bind(path.as_str())
        .bind(content_hash)
        .bind(size_bytes)
        .bind(content)
        .bind(self.site.updated_at)
        .execute(&mut *self.tx)
        .await?;

        self.files_written += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> MetadataResult<UploadReceipt> {
        let Self {
            tx,
            site,
            files_written,
            _slot,
        } = *self;
        tx.commit().await?;
        Ok(UploadReceipt {
            site,
            files_written,
        })
    }

    async fn rollback(self: Box<Self>) -> MetadataResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
