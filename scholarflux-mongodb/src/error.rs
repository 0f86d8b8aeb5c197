//! Error types for the MongoDB backend.

use scholarflux_backend::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("mongodb backend error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl From<Error> for CacheError {
    fn from(error: Error) -> Self {
        match error {
            Error::Mongo(e) => CacheError::Connection(Box::new(e)),
        }
    }
}
