//! Site store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{FileRepo, SiteRepo, UploadRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Combined site store trait.
///
/// The only shared mutable resource of the service. Readers go through
/// [`SiteRepo`] and [`FileRepo`]; every mutation goes through an
/// [`UploadRepo`] unit of work.
#[async_trait]
pub trait SiteStore: SiteRepo + FileRepo + UploadRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based site store.
///
/// Reads and writes use separate pools. Uploads take the write gate before
/// touching the single-connection writer pool, so a queue of uploads never
/// holds reader connections while it waits for SQLite's write lock.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    writer: Pool<Sqlite>,
    write_gate: Arc<Mutex<()>>,
    _temp_dir: Option<TempDir>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite store.
    ///
    /// `":memory:"` opens a throwaway database in a temporary directory that
    /// is removed when the store drops. A true in-memory database is private
    /// to one connection and could not be shared by the reader and writer
    /// pools.
    pub async fn new(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
        max_connections: u32,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();
        let in_memory = path.as_os_str() == ":memory:";

        let (db_path, temp_dir) = if in_memory {
            let temp_dir = tempfile::tempdir()?;
            (temp_dir.path().join("sites.db"), Some(temp_dir))
        } else {
            // Ensure parent directory exists
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            (path.to_path_buf(), None)
        };

        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path.display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .foreign_keys(true)
                .busy_timeout(busy_timeout);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts.clone())
            .await?;
        // WAL readers never wait on the writer.
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            writer,
            write_gate: Arc::new(Mutex::new(())),
            _temp_dir: temp_dir,
        };
        store.migrate().await?;

        tracing::debug!(
            path = %path.display(),
            in_memory,
            "SQLite site store opened"
        );

        Ok(store)
    }

    /// Get a reference to the reader connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl SiteStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.writer).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::repos::SiteUpload;
    use sitehost_core::{ContentHash, Hostname, SitePath};
    use sqlx::Transaction;
    use time::OffsetDateTime;
    use tokio::sync::OwnedMutexGuard;
    use uuid::Uuid;

    #[async_trait]
    impl SiteRepo for SqliteStore {
        async fn get_site(&self, site_id: Uuid) -> MetadataResult<Option<SiteRow>> {
            let row = sqlx::query_as::<_, SiteRow>(
                "SELECT site_id, hostname, created_at, updated_at FROM sites WHERE site_id = ?",
            )
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_site_by_hostname(
            &self,
            hostname: &Hostname,
        ) -> MetadataResult<Option<SiteRow>> {
            let row = sqlx::query_as::<_, SiteRow>(
                "SELECT site_id, hostname, created_at, updated_at FROM sites WHERE hostname = ?",
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
    impl FileRepo for SqliteStore {
        async fn get_file(&self, site_id: Uuid, path: &str) -> MetadataResult<Option<FileRow>> {
            let row = sqlx::query_as::<_, FileRow>(
                r#"
                SELECT f.file_id, f.site_id, f.path, f.content_hash, f.size_bytes, f.blob,
                       f.updated_at, s.updated_at AS site_updated_at
                FROM files f
                JOIN sites s ON s.site_id = f.site_id
                WHERE f.site_id = ? AND f.path = ?
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
                WHERE site_id = ?
                ORDER BY path
                "#,
            )
            .bind(site_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn count_files(&self, site_id: Uuid) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE site_id = ?")
                .bind(site_id)
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl UploadRepo for SqliteStore {
        async fn begin_site_upload(
            &self,
            hostname: &Hostname,
            now: OffsetDateTime,
        ) -> MetadataResult<Box<dyn SiteUpload>> {
            // Held until the upload commits, rolls back or drops.
            let write_guard = self.write_gate.clone().lock_owned().await;
            let mut tx = self.writer.begin().await?;

            // The first statement is a write, so the transaction takes SQLite's
            // write lock here. Another process sharing the file waits on
            // busy_timeout rather than failing a later read-to-write upgrade.
            let site = sqlx::query_as::<_, SiteRow>(
                r#"
                INSERT INTO sites (site_id, hostname, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(hostname) DO UPDATE SET updated_at = excluded.updated_at
                RETURNING site_id, hostname, created_at, updated_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(hostname.as_str())
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            Ok(Box::new(SqliteSiteUpload {
                tx,
                site,
                files_written: 0,
                _write_guard: write_guard,
            }))
        }
    }

    /// Open upload transaction against SQLite.
    struct SqliteSiteUpload {
        tx: Transaction<'static, Sqlite>,
        site: SiteRow,
        files_written: u64,
        _write_guard: OwnedMutexGuard<()>,
    }

    #[async_trait]
    impl SiteUpload for SqliteSiteUpload {
        async fn upsert_file(&mut self, path: &SitePath, content: &[u8]) -> MetadataResult<()> {
            let size_bytes = i64::try_from(content.len()).map_err(|_| {
                MetadataError::Internal(format!("file too large to store: {path}"))
            })?;
            let content_hash = ContentHash::compute(content).to_hex();

            sqlx::query(
                r#"
                INSERT INTO files (file_id, site_id, path, content_hash, size_bytes, blob, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(site_id, path) DO UPDATE SET
                    content_hash = excluded.content_hash,
                    size_bytes = excluded.size_bytes,
                    blob = excluded.blob,
                    updated_at = excluded.updated_at
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
                _write_guard,
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
}

const SCHEMA_SQL: &str = r#"
-- Sites: one row per hostname
CREATE TABLE IF NOT EXISTS sites (
    site_id BLOB PRIMARY KEY,
    hostname TEXT NOT NULL COLLATE NOCASE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(hostname)
);

-- Files: one row per (site, logical path)
CREATE TABLE IF NOT EXISTS files (
    file_id BLOB PRIMARY KEY,
    site_id BLOB NOT NULL REFERENCES sites(site_id),
    path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    blob BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, path)
);
CREATE INDEX IF NOT EXISTS idx_files_site ON files(site_id);
"#;
