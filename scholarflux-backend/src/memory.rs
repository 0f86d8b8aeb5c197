//! In-process cache backend, typically used as the fast local tier in front
//! of a durable remote [`crate::storage::Storage`].

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::entry::CacheEntry;
use crate::storage::{DeleteStatus, Storage, StorageResult};

/// A [`DashMap`]-backed in-memory [`Storage`].
///
/// Expired entries are evicted lazily on read rather than by a background
/// sweep, matching the read-path eviction `hitbox`'s moka backend relies on
/// moka itself to provide.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(Utc::now()) {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.clone()))
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        self.entries.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus> {
        match self.entries.remove(key) {
            Some(_) => Ok(DeleteStatus::Deleted),
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn label(&self) -> &'static str {
        "memory"
    }
}

/// A [`Storage`] that discards everything; useful for disabling caching
/// without threading an `Option<Storage>` through call sites.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl Storage for NullBackend {
    async fn get(&self, _key: &str) -> StorageResult<Option<CacheEntry>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _entry: CacheEntry) -> StorageResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> StorageResult<DeleteStatus> {
        Ok(DeleteStatus::Missing)
    }

    fn label(&self) -> &'static str {
        "null"
    }
}
