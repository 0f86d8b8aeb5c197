//! Deterministic cache key construction.

use sha2::{Digest, Sha256};

/// Builds a stable cache key from a provider name, a request signature
/// (typically the serialized query parameters), and an optional page number.
///
/// Hashing keeps keys a fixed, filesystem/Redis-key-safe length regardless of
/// how large the parameter set is, and serves as the fallback identity used
/// when two distinct parameter sets happen to serialize identically under a
/// lossy normalization.
pub fn build_cache_key(provider: &str, request_signature: &str, page: Option<u32>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update(b"\0");
    hasher.update(request_signature.as_bytes());
    if let Some(page) = page {
        hasher.update(b"\0page=");
        hasher.update(page.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    format!("{provider}:{}", hex::encode(digest))
}

/// Hashes a response body, used to detect whether a re-fetched page actually
/// changed before paying the cost of reprocessing it.
pub fn response_hash(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}
