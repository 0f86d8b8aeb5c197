//! Owns one provider's query against one coordinator: builds and sends
//! requests, retries and classifies responses, reads/writes the cache, and
//! exposes a lazy page stream with its own termination rules.

use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use scholarflux_backend::{CacheEntry, CacheManager, build_cache_key};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::RetryError;
use crate::rate_limiter::RateLimiter;
use crate::response::{APIResponse, ErrorResponse, NonResponse, SearchResult};
use crate::response_coordinator::ResponseCoordinator;
use crate::retry::{RetryConfig, RetryHandler};
use crate::search_api::SearchApi;

/// Prefix applied to request-cache keys so they never collide with the
/// processed-result cache's entries even when both tiers happen to share
/// one underlying [`CacheManager`]/[`Storage`](scholarflux_backend::Storage).
const REQUEST_CACHE_PREFIX: &str = "request:";

/// What the request-cache tier stores: just enough of the raw HTTP response
/// to re-enter the processing pipeline without a network round trip.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRequest {
    status: u16,
    body: Vec<u8>,
}

/// Coordinates one provider's paginated search: request construction,
/// rate-limited retry, response processing, and caching.
pub struct SearchCoordinator {
    pub provider_name: String,
    query: String,
    records_per_page: u32,
    api: SearchApi,
    retry: RetryHandler,
    response_coordinator: ResponseCoordinator,
    cancel: CancelToken,
    use_process_cache: bool,
    request_cache: Option<Arc<CacheManager>>,
}

impl SearchCoordinator {
    pub fn new(
        provider_name: impl Into<String>,
        query: impl Into<String>,
        records_per_page: u32,
        api: SearchApi,
        retry_config: RetryConfig,
        response_coordinator: ResponseCoordinator,
        use_process_cache: bool,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            query: query.into(),
            records_per_page,
            api,
            retry: RetryHandler::new(retry_config),
            response_coordinator,
            cancel: CancelToken::new(),
            use_process_cache,
            request_cache: None,
        }
    }

    /// Enables the HTTP-level request cache: a tier distinct from the
    /// processed-result cache that stores the raw status/body of a page
    /// fetch, keyed the same way, so a repeated identical request can skip
    /// the network (and the retry loop) entirely even when the processed-
    /// result cache has been cleared or `use_process_cache` is off.
    pub fn with_request_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.request_cache = Some(cache);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Fetches and processes a single page, consulting the processed-result
    /// cache first when enabled, then the request cache, then the network.
    pub async fn search(&self, page: u32) -> SearchResult {
        let mut extra = HashMap::new();
        extra.insert("query".to_owned(), self.query.clone());
        let params = self.api.build_parameters(page, &extra).await;
        let signature = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        let cache_key = build_cache_key(&self.provider_name, &signature, Some(page));

        if self.use_process_cache {
            match self.response_coordinator.lookup_cache(&cache_key).await {
                Ok(Some(cached)) => {
                    debug!(page, cache_key, "processed-result cache hit");
                    return self.result(page, APIResponse::Processed(Box::new(cached)));
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(page, error = %e, "cache lookup failed, falling through to request");
                }
            }
        }

        let response = self.fetch_and_process(page, &cache_key, &extra).await;
        self.result(page, response)
    }

    /// Looks up `cache_key` in the request-cache tier. A hit skips the
    /// network and the retry loop entirely, re-entering the pipeline at
    /// `ResponseCoordinator::process` with the cached status/body.
    async fn lookup_request_cache(&self, cache_key: &str) -> Option<CachedRequest> {
        let cache = self.request_cache.as_ref()?;
        match cache.get(&format!("{REQUEST_CACHE_PREFIX}{cache_key}")).await {
            Ok(Some(entry)) => match serde_json::from_slice::<CachedRequest>(&entry.blob) {
                Ok(cached) => Some(cached),
                Err(e) => {
                    warn!(cache_key, error = %e, "request-cache entry did not decode, treating as a miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(cache_key, error = %e, "request-cache lookup failed, falling through to network");
                None
            }
        }
    }

    async fn write_request_cache(&self, cache_key: &str, status: u16, body: &[u8]) {
        let Some(cache) = &self.request_cache else {
            return;
        };
        let cached = CachedRequest { status, body: body.to_vec() };
        let blob = match serde_json::to_vec(&cached) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(cache_key, error = %e, "failed to encode request-cache entry");
                return;
            }
        };
        if let Err(e) = cache.set(&format!("{REQUEST_CACHE_PREFIX}{cache_key}"), CacheEntry::new(blob, None)).await {
            warn!(cache_key, error = %e, "failed to write request-cache entry");
        }
    }

    async fn fetch_and_process(&self, page: u32, cache_key: &str, extra: &HashMap<String, String>) -> APIResponse {
        if let Some(cached) = self.lookup_request_cache(cache_key).await {
            debug!(page, cache_key, "request cache hit, skipping network");
            return self.response_coordinator.process(cache_key, cached.status, &cached.body, true).await;
        }

        let outcome = self
            .retry
            .execute(&self.cancel, |attempt| {
                let extra = extra.clone();
                async move {
                    debug!(page, attempt, "requesting page");
                    let raw = self.api.search(page, &extra).await?;
                    Ok::<_, reqwest::Error>((raw.status, raw.retry_after, raw))
                }
            })
            .await;

        match outcome {
            Ok(outcome) => {
                self.write_request_cache(cache_key, outcome.response.status, &outcome.response.body).await;
                self.response_coordinator
                    .process(cache_key, outcome.response.status, &outcome.response.body, false)
                    .await
            }
            Err(RetryError::RequestFailed { status }) => {
                ErrorResponse::from_pipeline_error(cache_key, Some(status), permanent_status_error(status)).into()
            }
            Err(e @ RetryError::RetryLimitExceeded { .. }) => non_terminal_error(cache_key, e),
            Err(e @ RetryError::Cancelled) => non_terminal_error(cache_key, e),
            Err(e @ RetryError::Transport(_)) => non_terminal_error(cache_key, e),
        }
    }

    fn result(&self, page: u32, response: APIResponse) -> SearchResult {
        SearchResult {
            page,
            query: self.query.clone(),
            provider_name: self.provider_name.clone(),
            response,
        }
    }

    /// Whether `response` should stop a page sequence: a permanent error, or
    /// a processed page with fewer records than a full page (including zero).
    fn should_stop(&self, response: &APIResponse) -> bool {
        match response {
            APIResponse::Processed(r) => (r.processed_records.len() as u32) < self.records_per_page,
            APIResponse::Error(_) | APIResponse::Non(_) => true,
        }
    }

    /// Lazily fetches pages starting at `start_page`, yielding every result
    /// and stopping after the first short page, zero-record page, or
    /// permanent error — whichever comes first. `max_pages` caps the
    /// sequence length regardless of termination rules.
    pub fn iter_pages(self: Arc<Self>, start_page: u32, max_pages: Option<u32>) -> impl Stream<Item = SearchResult> {
        async_stream::stream! {
            let mut page = start_page;
            let mut yielded = 0u32;
            loop {
                if let Some(max) = max_pages {
                    if yielded >= max {
                        break;
                    }
                }
                let result = self.search(page).await;
                let stop = self.should_stop(&result.response);
                yielded += 1;
                if stop {
                    info!(provider = %self.provider_name, page, "page sequence terminated");
                    yield result;
                    break;
                }
                yield result;
                page += 1;
            }
        }
    }
}

fn permanent_status_error(status: u16) -> crate::error::PipelineError {
    crate::error::PipelineError::DataParsing(format!("request failed permanently with status {status}"))
}

fn non_terminal_error(cache_key: &str, error: RetryError) -> APIResponse {
    APIResponse::Non(NonResponse {
        cache_key: cache_key.to_owned(),
        created_at: chrono::Utc::now(),
        reason: error.to_string(),
    })
}

impl From<ErrorResponse> for APIResponse {
    fn from(value: ErrorResponse) -> Self {
        APIResponse::Error(value)
    }
}
