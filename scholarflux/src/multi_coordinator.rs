//! A keyed collection of [`SearchCoordinator`]s, sharing one
//! [`RateLimiterRegistry`] so two coordinators registered against the same
//! provider never race past its minimum interval.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use futures::stream::BoxStream;
use futures::{StreamExt, pin_mut};
use tokio::sync::Semaphore;

use crate::api_key::ApiKey;
use crate::error::ConfigError;
use crate::rate_limiter::RateLimiterRegistry;
use crate::response::SearchResult;
use crate::response_coordinator::ResponseCoordinator;
use crate::retry::RetryConfig;
use crate::search_api::{SearchApi, SearchApiConfig};
use crate::search_coordinator::SearchCoordinator;

/// Caps the number of concurrently polled providers in
/// [`MultiSearchCoordinator::iter_pages_threaded`] when the caller asks for
/// more workers than this.
const MAX_WORKERS: usize = 8;

/// Owns one [`SearchCoordinator`] per (label, provider) pair and the shared
/// rate-limiter registry they draw from.
pub struct MultiSearchCoordinator {
    coordinators: indexmap::IndexMap<String, Arc<SearchCoordinator>>,
    limiters: Arc<RateLimiterRegistry>,
}

impl Default for MultiSearchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiSearchCoordinator {
    pub fn new() -> Self {
        Self {
            coordinators: indexmap::IndexMap::new(),
            limiters: Arc::new(RateLimiterRegistry::new()),
        }
    }

    /// Registers a new coordinator under `label`, sharing `provider`'s
    /// rate limiter with any other coordinator already registered for the
    /// same provider name.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        label: impl Into<String>,
        provider: &scholarflux_providers::ProviderInfo,
        query: impl Into<String>,
        api_key: Option<ApiKey>,
        retry_config: RetryConfig,
        response_coordinator: ResponseCoordinator,
        use_process_cache: bool,
        request_cache: Option<Arc<scholarflux_backend::CacheManager>>,
    ) -> Result<(), ConfigError> {
        let limiter = self
            .limiters
            .get_or_insert(&provider.name, Duration::from_secs_f64(provider.request_delay.max(0.0)));
        let config = SearchApiConfig::from_provider(provider, api_key)?;
        let api = SearchApi::new(config, limiter)?;
        let mut coordinator = SearchCoordinator::new(
            provider.name.clone(),
            query,
            provider.records_per_page,
            api,
            retry_config,
            response_coordinator,
            use_process_cache,
        );
        if let Some(cache) = request_cache {
            coordinator = coordinator.with_request_cache(cache);
        }
        self.coordinators.insert(label.into(), Arc::new(coordinator));
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<Arc<SearchCoordinator>> {
        self.coordinators.get(label).cloned()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.coordinators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }

    /// Streams up to `pages` pages from every registered coordinator.
    ///
    /// `iterate_by_group = true` drains one coordinator's full page
    /// sequence before moving to the next, in registration order.
    /// `iterate_by_group = false` interleaves providers deterministically:
    /// page 1 from every coordinator in registration order, then page 2
    /// from every coordinator still running, and so on — a coordinator
    /// that stops early (permanent error, short page) simply drops out of
    /// later rounds rather than blocking the others. This is a strict
    /// provider-major alternation, not a race; completion-order streaming
    /// is reserved for [`Self::iter_pages_threaded`].
    pub fn iter_pages(&self, pages: u32, iterate_by_group: bool) -> BoxStream<'static, SearchResult> {
        let streams: Vec<BoxStream<'static, SearchResult>> = self
            .coordinators
            .values()
            .cloned()
            .map(|coordinator| coordinator.iter_pages(1, Some(pages)).boxed())
            .collect();

        if iterate_by_group {
            futures::stream::iter(streams).flatten().boxed()
        } else {
            round_robin(streams).boxed()
        }
    }

    /// Like [`Self::iter_pages`], but each coordinator's page sequence runs
    /// on its own spawned task, bounded to `min(MAX_WORKERS, provider
    /// count, max_workers)` concurrently running providers. Results are
    /// streamed back in completion order, not registration order.
    pub fn iter_pages_threaded(&self, pages: u32, max_workers: usize) -> BoxStream<'static, SearchResult> {
        let workers = max_workers.min(MAX_WORKERS).min(self.coordinators.len()).max(1);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let semaphore = Arc::new(Semaphore::new(workers));

        for coordinator in self.coordinators.values().cloned() {
            let tx = tx.clone();
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let stream = coordinator.iter_pages(1, Some(pages));
                pin_mut!(stream);
                while let Some(result) = stream.next().await {
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        async_stream::stream! {
            while let Some(result) = rx.recv().await {
                yield result;
            }
        }
        .boxed()
    }
}

/// Drives every stream exactly one step per round, in the order given,
/// dropping a stream out of the rotation once it is exhausted. Because each
/// step is `await`ed in order rather than raced, the yield order across
/// streams is a deterministic provider-major interleave: every stream's
/// page N precedes every stream's page N+1.
fn round_robin(streams: Vec<BoxStream<'static, SearchResult>>) -> impl Stream<Item = SearchResult> {
    async_stream::stream! {
        let mut slots: Vec<Option<BoxStream<'static, SearchResult>>> = streams.into_iter().map(Some).collect();
        loop {
            let mut advanced = false;
            for slot in slots.iter_mut() {
                let Some(stream) = slot else { continue };
                advanced = true;
                match stream.next().await {
                    Some(result) => yield result,
                    None => *slot = None,
                }
            }
            if !advanced {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarflux_backend::{CacheManager, MemoryBackend};
    use scholarflux_core::{DataExtractor, DiscoveryConfig, ExtractionMode, FlattenConfig, KeyFilter, RecursiveDataProcessor};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response_coordinator() -> ResponseCoordinator {
        let extractor = DataExtractor::new(
            ExtractionMode::Static {
                record_path: "docs".to_owned(),
                metadata_paths: vec![],
            },
            ".",
        );
        let processor = Arc::new(RecursiveDataProcessor {
            discovery: DiscoveryConfig::default(),
            flatten: FlattenConfig::default(),
            filter: KeyFilter::default(),
        });
        let cache = Arc::new(CacheManager::local_only(Arc::new(MemoryBackend::new())));
        ResponseCoordinator::new(extractor, processor, None, cache, None)
    }

    async fn provider_for(server: &MockServer) -> scholarflux_providers::ProviderInfo {
        scholarflux_providers::ProviderInfo::new(
            "test",
            server.uri(),
            scholarflux_providers::APIParameterMap::new("q", "rows").with_start("start"),
        )
        .unwrap()
        .with_records_per_page(5)
        .with_request_delay(0.0)
    }

    #[tokio::test]
    async fn registering_same_provider_twice_shares_one_limiter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"docs": []})))
            .mount(&server)
            .await;
        let provider = provider_for(&server).await;

        let mut multi = MultiSearchCoordinator::new();
        multi
            .register("q1", &provider, "rust", None, RetryConfig::default(), response_coordinator(), false, None)
            .unwrap();
        multi
            .register("q2", &provider, "wasm", None, RetryConfig::default(), response_coordinator(), false, None)
            .unwrap();

        assert!(Arc::ptr_eq(
            &multi.limiters.get("test").unwrap(),
            &multi.limiters.get("TEST").unwrap()
        ));
        assert_eq!(multi.len(), 2);
    }

    #[tokio::test]
    async fn iter_pages_grouped_drains_each_provider_fully() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "docs": [{"title": "a"}]
            })))
            .mount(&server)
            .await;
        let provider = provider_for(&server).await;

        let mut multi = MultiSearchCoordinator::new();
        multi
            .register("only", &provider, "rust", None, RetryConfig::default(), response_coordinator(), false, None)
            .unwrap();

        let results: Vec<_> = multi.iter_pages(3, true).collect().await;
        assert_eq!(results.len(), 1, "a single short page should terminate the sequence");
    }

    #[tokio::test]
    async fn iter_pages_round_robin_is_provider_major_deterministic() {
        let server_a = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "docs": [{"title": "a"}, {"title": "a"}]
            })))
            .mount(&server_a)
            .await;
        let server_b = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "docs": [{"title": "b"}, {"title": "b"}]
            })))
            .mount(&server_b)
            .await;

        let mut multi = MultiSearchCoordinator::new();
        for (label, server) in [("a", &server_a), ("b", &server_b)] {
            let provider = scholarflux_providers::ProviderInfo::new(
                label,
                server.uri(),
                scholarflux_providers::APIParameterMap::new("q", "rows").with_start("start"),
            )
            .unwrap()
            .with_records_per_page(2)
            .with_request_delay(0.0);
            multi
                .register(label, &provider, "rust", None, RetryConfig::default(), response_coordinator(), false, None)
                .unwrap();
        }

        let results: Vec<_> = multi.iter_pages(2, false).collect().await;
        let order: Vec<(&str, u32)> = results.iter().map(|r| (r.provider_name.as_str(), r.page)).collect();
        assert_eq!(order, vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
    }

    #[tokio::test]
    async fn iter_pages_threaded_collects_results_from_all_providers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "docs": [{"title": "a"}]
            })))
            .mount(&server)
            .await;
        let provider = provider_for(&server).await;

        let mut multi = MultiSearchCoordinator::new();
        multi
            .register("a", &provider, "rust", None, RetryConfig::default(), response_coordinator(), false, None)
            .unwrap();
        multi
            .register("b", &provider, "wasm", None, RetryConfig::default(), response_coordinator(), false, None)
            .unwrap();

        let results: Vec<_> = multi.iter_pages_threaded(2, 4).collect().await;
        assert_eq!(results.len(), 2);
    }
}
