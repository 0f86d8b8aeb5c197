//! Redis-backed storage for scholar-flux's two-tier cache.

pub mod backend;
pub mod error;

pub use backend::{RedisBackend, RedisBackendBuilder};
pub use error::Error;
