//! Error taxonomy for the request/retry/coordination layer.

use thiserror::Error;

/// Raised eagerly at construction; never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: String },

    #[error("provider {provider} requires an API key but none was supplied")]
    MissingApiKey { provider: String },

    #[error(transparent)]
    Provider(#[from] scholarflux_providers::ProviderError),

    #[error("malformed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors surfaced by [`crate::retry::RetryHandler`].
#[derive(Debug, Error)]
pub enum RetryError {
    /// The validator classified the final response as a permanent failure.
    #[error("request failed permanently with status {status}")]
    RequestFailed { status: u16 },

    /// `max_attempts` was exhausted without an `ok` classification.
    #[error("retry limit of {max_attempts} attempts exceeded")]
    RetryLimitExceeded { max_attempts: u32 },

    /// A cancel token fired mid-retry.
    #[error("retry loop cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Errors raised while parsing or extracting a response body. Caught by
/// [`crate::response_coordinator::ResponseCoordinator`] and folded into an
/// error-bearing `ProcessedResponse` rather than propagated.
#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    #[error("response body could not be parsed as JSON: {0}")]
    DataParsing(String),

    #[error(transparent)]
    Processing(#[from] scholarflux_core::ProcessingError),

    #[error(transparent)]
    Normalization(#[from] scholarflux_core::NormalizationError),
}
