//! Multi-provider academic search aggregation: per-provider rate-limited
//! request scheduling, retry/backoff, response parsing/extraction/
//! normalization, and two-tier caching, composable into single- and
//! multi-provider search coordinators.
//!
//! The pipeline one page moves through:
//!
//! 1. [`search_coordinator::SearchCoordinator`] builds and, via
//!    [`search_api::SearchApi`], rate-limits and sends the request, retrying
//!    through [`retry::RetryHandler`] according to [`validator::ResponseValidator`]'s
//!    classification of each attempt.
//! 2. [`response_coordinator::ResponseCoordinator`] parses the body and runs
//!    it through a `scholarflux_core` extractor/processor/normalizer chain,
//!    reading and writing the processed-result cache around that pipeline.
//! 3. [`multi_coordinator::MultiSearchCoordinator`] composes many
//!    coordinators, sharing one [`rate_limiter::RateLimiterRegistry`] across
//!    coordinators registered against the same provider.
//!
//! [`workflow::Workflow`] is an extension point for providers whose search
//! protocol needs more than one request per logical query.

pub mod api_key;
pub mod cancel;
pub mod error;
pub mod multi_coordinator;
pub mod rate_limiter;
pub mod response;
pub mod response_coordinator;
pub mod retry;
pub mod search_api;
pub mod search_coordinator;
pub mod validator;
pub mod workflow;

pub use api_key::ApiKey;
pub use cancel::CancelToken;
pub use error::{ConfigError, PipelineError, RetryError};
pub use multi_coordinator::MultiSearchCoordinator;
pub use rate_limiter::{RateLimiter, RateLimiterRegistry};
pub use response::{APIResponse, ErrorResponse, NonResponse, ProcessedResponse, SearchResult, SearchResultList};
pub use response_coordinator::ResponseCoordinator;
pub use retry::{Outcome, RetryConfig, RetryHandler};
pub use search_api::{RawResponse, SearchApi, SearchApiConfig};
pub use search_coordinator::SearchCoordinator;
pub use validator::{Classification, ResponseValidator};
pub use workflow::{Step, StepContext, TwoPageWorkflow, Workflow};

pub use scholarflux_backend::{CacheEntry, CacheError, CacheManager, Storage};
pub use scholarflux_providers::{APIParameterMap, ProviderInfo, builtin_names, lookup, lookup_by_url};
