//! Errors raised while building or validating provider parameter configuration.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid URL for provider {provider}: {url}")]
    InvalidUrl { provider: String, url: String },

    #[error("provider {0} is not registered")]
    UnknownProvider(String),

    #[error("no registered provider's base_url matches {0}")]
    UnresolvedUrl(String),

    #[error("provider {provider} requires an API key but none was supplied")]
    MissingApiKey { provider: String },
}
