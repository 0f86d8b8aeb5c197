//! The storage trait every cache backend implements.

use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::CacheError;

/// Result of a delete operation.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    Missing,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, CacheError>;

/// Low-level, dyn-compatible cache storage trait.
///
/// Every backend — in-memory, Redis, SQL, MongoDB, or the no-op null backend
/// — implements this directly; [`crate::manager::CacheManager`] composes two
/// of them into a two-tier (fast local, durable shared) cache.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads a cache entry by key. Returns `Ok(None)` on miss, including
    /// when the stored entry has already expired.
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>>;

    /// Writes an entry, overwriting any existing value at `key`.
    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()>;

    /// Removes a key.
    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus>;

    /// Human-readable backend name, used in `tracing` fields.
    fn label(&self) -> &'static str;
}

#[async_trait]
impl Storage for Box<dyn Storage> {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        (**self).set(key, entry).await
    }

    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus> {
        (**self).delete(key).await
    }

    fn label(&self) -> &'static str {
        (**self).label()
    }
}

#[async_trait]
impl Storage for std::sync::Arc<dyn Storage> {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        (**self).set(key, entry).await
    }

    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus> {
        (**self).delete(key).await
    }

    fn label(&self) -> &'static str {
        (**self).label()
    }
}
