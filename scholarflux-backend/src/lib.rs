//! Storage trait, cache entry model, and baseline backends shared by every
//! per-backend storage crate (`scholarflux-redis`, `scholarflux-sql`,
//! `scholarflux-mongodb`).

pub mod entry;
pub mod error;
pub mod key;
pub mod manager;
pub mod memory;
pub mod storage;

pub use entry::{CacheEntry, BLOB_SENTINEL};
pub use error::CacheError;
pub use key::{build_cache_key, response_hash};
pub use manager::CacheManager;
pub use memory::{MemoryBackend, NullBackend};
pub use storage::{DeleteStatus, Storage, StorageResult};
