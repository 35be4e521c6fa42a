//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4444").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted size of an upload request body in bytes.
    /// Archives are buffered in memory in full, so this also bounds the
    /// memory one upload can hold.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Mount the /metrics endpoint for Prometheus scraping (default: false).
    /// The endpoint shadows a tenant file at `/metrics` on every host, so it
    /// stays off unless explicitly enabled.
    #[serde(default)]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:4444".to_string()
}

fn default_max_upload_bytes() -> u64 {
    crate::DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            metrics_enabled: false,
        }
    }
}

impl ServerConfig {
    /// Upload body limit as a `usize`, saturating on narrow targets.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Site store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path (":memory:" for a throwaway database).
        path: PathBuf,
        /// How long a writer waits for another writer's transaction to
        /// finish before failing with "database is locked".
        #[serde(default = "default_sqlite_busy_timeout_secs")]
        busy_timeout_secs: u64,
        /// Maximum reader connections. Uploads write through one separate
        /// connection, and WAL mode lets readers proceed while it holds the
        /// write lock.
        #[serde(default = "default_sqlite_max_connections")]
        max_connections: u32,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host (e.g., "localhost" or "db.example.com").
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer SITEHOST_METADATA__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool (at least 2). Open uploads may
        /// use all but one of them.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds (prevents hung queries).
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_sqlite_busy_timeout_secs() -> u64 {
    30
}

fn default_sqlite_max_connections() -> u32 {
    4
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(60_000)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/sites.db"),
            busy_timeout_secs: default_sqlite_busy_timeout_secs(),
            max_connections: default_sqlite_max_connections(),
        }
    }
}

impl MetadataConfig {
    /// SQLite configuration for the given path with default tuning.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite {
            path: path.into(),
            busy_timeout_secs: default_sqlite_busy_timeout_secs(),
            max_connections: default_sqlite_max_connections(),
        }
    }

    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite {
                max_connections, ..
            } => {
                if *max_connections == 0 {
                    return Err("sqlite max_connections must be at least 1".to_string());
                }
                Ok(())
            }
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => Err(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ),
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }

    /// SQLite busy timeout as a Duration.
    pub fn busy_timeout(&self) -> Option<Duration> {
        match self {
            MetadataConfig::Sqlite {
                busy_timeout_secs, ..
            } => Some(Duration::from_secs(*busy_timeout_secs)),
            MetadataConfig::Postgres { .. } => None,
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Site store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses an in-memory SQLite database.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::sqlite(":memory:"),
        }
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes must be greater than zero".to_string());
        }
        self.metadata.validate()
    }
}
