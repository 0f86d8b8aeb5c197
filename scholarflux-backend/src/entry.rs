//! The value stored against a cache key: an opaque blob plus the bookkeeping
//! [`crate::manager::CacheManager`] needs to decide freshness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel prefix marking a JSON string as a base64-encoded raw blob rather
/// than literal text. Backends that can only store JSON scalars (SQL text
/// columns, MongoDB documents) round-trip arbitrary bytes through this
/// encoding; backends with native byte columns may ignore it.
pub const BLOB_SENTINEL: &str = "\u{0}b64:";

/// An opaque cached value plus its storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// The cached payload, already serialized by the caller (typically a
    /// `ProcessedResponse` encoded as JSON bytes).
    pub blob: Vec<u8>,
    /// SHA-256 hex digest of `blob`, used to detect no-op rewrites.
    pub response_hash: String,
    pub stored_at: DateTime<Utc>,
    /// Absolute expiry. `None` means the entry never expires on its own and
    /// relies on explicit eviction.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(blob: Vec<u8>, ttl: Option<chrono::Duration>) -> Self {
        let stored_at = Utc::now();
        let response_hash = crate::key::response_hash(&blob);
        let expires_at = ttl.map(|d| stored_at + d);
        Self {
            blob,
            response_hash,
            stored_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Encodes `blob` as a JSON-safe string using the sentinel prefix.
    pub fn encode_blob(blob: &[u8]) -> String {
        format!(
            "{BLOB_SENTINEL}{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, blob)
        )
    }

    /// Decodes a string previously produced by [`Self::encode_blob`].
    pub fn decode_blob(encoded: &str) -> Result<Vec<u8>, crate::error::CacheError> {
        let payload = encoded.strip_prefix(BLOB_SENTINEL).unwrap_or(encoded);
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, payload)
            .map_err(|e| crate::error::CacheError::Internal(Box::new(e)))
    }
}
