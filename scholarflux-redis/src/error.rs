//! Error types for the Redis backend.

use scholarflux_backend::CacheError;

/// Wraps errors from the underlying [`redis`] crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("redis backend error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<Error> for CacheError {
    fn from(error: Error) -> Self {
        match error {
            Error::Redis(e) => CacheError::Connection(Box::new(e)),
        }
    }
}
