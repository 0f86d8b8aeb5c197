//! Error types for cache storage operations.

use thiserror::Error;

/// Error type for [`crate::storage::Storage`] operations.
///
/// Categorizes failures into distinct groups so callers (in particular the
/// two-tier [`crate::manager::CacheManager`]) can decide whether a failure is
/// safe to treat as a cache miss or must propagate.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Internal backend error: state or computation error unrelated to
    /// network interaction.
    #[error("cache backend internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),

    /// Failure communicating with a remote backend (Redis, SQL, MongoDB).
    #[error("cache backend connection error: {0}")]
    Connection(Box<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be serialized or deserialized.
    #[error("cache entry (de)serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend was asked to perform an operation it does not support
    /// (e.g. TTL query against a backend with no expiry model).
    #[error("unsupported cache operation: {0}")]
    Unsupported(String),
}
