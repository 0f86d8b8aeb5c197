//! Error types for the SQL backend.

use scholarflux_backend::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sql backend error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl From<Error> for CacheError {
    fn from(error: Error) -> Self {
        match error {
            Error::Sqlx(e) => CacheError::Connection(Box::new(e)),
        }
    }
}
