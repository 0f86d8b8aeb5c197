//! Two-tier cache composition: a fast local tier in front of a durable
//! shared tier.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::storage::{DeleteStatus, Storage};

/// Composes a local [`Storage`] (typically [`crate::memory::MemoryBackend`])
/// with a remote one (Redis/SQL/MongoDB), checking the local tier first and
/// populating it from the remote tier on a local miss.
///
/// Writes go to both tiers so a subsequent read from either is consistent.
/// The remote tier is authoritative: if it is unreachable, reads and writes
/// to it fail loudly rather than silently degrading to local-only, since a
/// silent degrade would let stale/duplicate work proceed unnoticed.
pub struct CacheManager {
    local: Arc<dyn Storage>,
    remote: Arc<dyn Storage>,
}

impl CacheManager {
    pub fn new(local: Arc<dyn Storage>, remote: Arc<dyn Storage>) -> Self {
        Self { local, remote }
    }

    /// A manager with no remote tier — local storage only.
    pub fn local_only(local: Arc<dyn Storage>) -> Self {
        let remote = Arc::new(crate::memory::NullBackend);
        Self { local, remote }
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        if let Some(entry) = self.local.get(key).await? {
            trace!(key, backend = self.local.label(), "cache hit");
            return Ok(Some(entry));
        }
        match self.remote.get(key).await? {
            Some(entry) => {
                debug!(key, backend = self.remote.label(), "cache hit, repopulating local tier");
                self.local.set(key, entry.clone()).await?;
                Ok(Some(entry))
            }
            None => {
                trace!(key, "cache miss on both tiers");
                Ok(None)
            }
        }
    }

    /// Writes `entry` to both tiers unless its `response_hash` matches what
    /// is already stored remotely, in which case the write is a no-op aside
    /// from refreshing the local tier — this is the no-op-rewrite detection
    /// the two-tier design exists for.
    pub async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        if let Some(existing) = self.remote.get(key).await? {
            if existing.response_hash == entry.response_hash {
                debug!(key, "unchanged response, skipping remote rewrite");
                self.local.set(key, existing).await?;
                return Ok(());
            }
        }
        self.remote.set(key, entry.clone()).await?;
        self.local.set(key, entry).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<DeleteStatus, CacheError> {
        let local_status = self.local.delete(key).await?;
        let remote_status = self.remote.delete(key).await?;
        Ok(if local_status == DeleteStatus::Deleted || remote_status == DeleteStatus::Deleted {
            DeleteStatus::Deleted
        } else {
            DeleteStatus::Missing
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[tokio::test]
    async fn remote_hit_repopulates_local_tier() {
        let local = Arc::new(MemoryBackend::new());
        let remote = Arc::new(MemoryBackend::new());
        let manager = CacheManager::new(local.clone(), remote.clone());

        let entry = CacheEntry::new(b"value".to_vec(), None);
        remote.set("k", entry.clone()).await.unwrap();

        assert_eq!(manager.get("k").await.unwrap(), Some(entry.clone()));
        assert_eq!(local.get("k").await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn set_skips_remote_rewrite_when_hash_unchanged() {
        let local = Arc::new(MemoryBackend::new());
        let remote = Arc::new(MemoryBackend::new());
        let manager = CacheManager::new(local, remote.clone());

        let entry = CacheEntry::new(b"same".to_vec(), None);
        manager.set("k", entry.clone()).await.unwrap();
        let first_stored_at = remote.get("k").await.unwrap().unwrap().stored_at;

        let entry2 = CacheEntry::new(b"same".to_vec(), None);
        manager.set("k", entry2).await.unwrap();
        let second_stored_at = remote.get("k").await.unwrap().unwrap().stored_at;

        assert_eq!(first_stored_at, second_stored_at);
    }

    #[tokio::test]
    async fn delete_reports_deleted_if_either_tier_had_the_key() {
        let local = Arc::new(MemoryBackend::new());
        let remote = Arc::new(MemoryBackend::new());
        let manager = CacheManager::new(local, remote.clone());

        remote.set("k", CacheEntry::new(b"v".to_vec(), None)).await.unwrap();
        assert_eq!(manager.delete("k").await.unwrap(), DeleteStatus::Deleted);
    }
}
