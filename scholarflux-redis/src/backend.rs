//! Redis-backed [`Storage`] implementation.

use async_trait::async_trait;
use chrono::Utc;
use redis::{Client, aio::ConnectionManager};
use scholarflux_backend::{CacheEntry, CacheError, DeleteStatus, Storage, StorageResult};
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Error;

/// Distributed [`Storage`] backed by Redis, used as the remote tier of a
/// [`scholarflux_backend::CacheManager`].
///
/// Stores each entry as a Redis hash with two fields: `"d"` holds the
/// serialized blob, `"h"` holds the response hash, and the entry's TTL maps
/// onto Redis's native `EXPIRE`. The connection is established lazily on
/// first use so constructing a backend never blocks.
pub struct RedisBackend {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    label: &'static str,
}

impl RedisBackend {
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    pub fn builder() -> RedisBackendBuilder {
        RedisBackendBuilder::default()
    }

    async fn connection(&self) -> Result<ConnectionManager, Error> {
        trace!("get redis connection manager");
        let manager = self
            .connection
            .get_or_try_init(|| async { self.client.get_connection_manager().await })
            .await?;
        Ok(manager.clone())
    }
}

/// Builder for [`RedisBackend`].
pub struct RedisBackendBuilder {
    connection_info: String,
    label: &'static str,
}

impl Default for RedisBackendBuilder {
    fn default() -> Self {
        Self {
            connection_info: "redis://127.0.0.1/".to_owned(),
            label: "redis",
        }
    }
}

impl RedisBackendBuilder {
    pub fn server(mut self, connection_info: impl Into<String>) -> Self {
        self.connection_info = connection_info.into();
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn build(self) -> Result<RedisBackend, Error> {
        Ok(RedisBackend {
            client: Client::open(self.connection_info)?,
            connection: OnceCell::new(),
            label: self.label,
        })
    }
}

#[async_trait]
impl Storage for RedisBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        let mut con = self.connection().await.map_err(Error::from)?;

        let ((data, hash), pttl): ((Option<Vec<u8>>, Option<String>), i64) = redis::pipe()
            .cmd("HMGET")
            .arg(key)
            .arg("d")
            .arg("h")
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut con)
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;

        let (Some(blob), Some(response_hash)) = (data, hash) else {
            return Ok(None);
        };

        let expires_at = (pttl > 0).then(|| Utc::now() + chrono::Duration::milliseconds(pttl));
        Ok(Some(CacheEntry {
            blob,
            response_hash,
            stored_at: Utc::now(),
            expires_at,
        }))
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        let mut con = self.connection().await.map_err(Error::from)?;

        let mut pipe = redis::pipe();
        pipe.cmd("HSET")
            .arg(key)
            .arg("d")
            .arg(&entry.blob)
            .arg("h")
            .arg(&entry.response_hash)
            .ignore();
        if let Some(expires_at) = entry.expires_at {
            let ttl_seconds = (expires_at - Utc::now()).num_seconds().max(1);
            pipe.cmd("EXPIRE").arg(key).arg(ttl_seconds).ignore();
        }
        pipe.query_async::<()>(&mut con)
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus> {
        let mut con = self.connection().await.map_err(Error::from)?;
        let deleted: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut con)
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;
        Ok(if deleted > 0 {
            DeleteStatus::Deleted
        } else {
            DeleteStatus::Missing
        })
    }

    fn label(&self) -> &'static str {
        self.label
    }
}
