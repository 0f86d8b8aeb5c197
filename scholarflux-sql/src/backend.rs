//! SQL-backed [`Storage`] implementation, generic over any `sqlx::Sqlite`
//! pool. Swapping to Postgres is a matter of switching the `sqlx` driver
//! feature and the pool type this module constructs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholarflux_backend::{CacheEntry, CacheError, DeleteStatus, Storage, StorageResult};
use sqlx::{Row, SqlitePool};

use crate::error::Error;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    blob BLOB NOT NULL,
    response_hash TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    expires_at TEXT
)";

/// [`Storage`] backed by a SQL table, defaulting to an embedded SQLite pool
/// so tests and small deployments need no external infrastructure.
pub struct SqlBackend {
    pool: SqlitePool,
    label: &'static str,
}

impl SqlBackend {
    /// Connects to `url` (e.g. `sqlite::memory:` or `sqlite:cache.db`) and
    /// ensures the backing table exists.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(url).await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self {
            pool,
            label: "sql",
        })
    }

    pub async fn in_memory() -> Result<Self, Error> {
        Self::connect("sqlite::memory:").await
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

#[async_trait]
impl Storage for SqlBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        let row = sqlx::query("SELECT blob, response_hash, stored_at, expires_at FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let blob: Vec<u8> = row.try_get("blob").map_err(|e| CacheError::from(Error::from(e)))?;
        let response_hash: String = row.try_get("response_hash").map_err(|e| CacheError::from(Error::from(e)))?;
        let stored_at: DateTime<Utc> = row.try_get("stored_at").map_err(|e| CacheError::from(Error::from(e)))?;
        let expires_at: Option<DateTime<Utc>> = row.try_get("expires_at").map_err(|e| CacheError::from(Error::from(e)))?;

        let entry = CacheEntry {
            blob,
            response_hash,
            stored_at,
            expires_at,
        };

        if entry.is_expired(Utc::now()) {
            self.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO cache_entries (key, blob, response_hash, stored_at, expires_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                blob = excluded.blob,
                response_hash = excluded.response_hash,
                stored_at = excluded.stored_at,
                expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(&entry.blob)
        .bind(&entry.response_hash)
        .bind(entry.stored_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::from(Error::from(e)))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;
        Ok(if result.rows_affected() > 0 {
            DeleteStatus::Deleted
        } else {
            DeleteStatus::Missing
        })
    }

    fn label(&self) -> &'static str {
        self.label
    }
}
