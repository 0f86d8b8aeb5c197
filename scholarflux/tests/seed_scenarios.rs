//! End-to-end scenarios exercised against mock HTTP servers, one per
//! documented acceptance scenario.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::StreamExt;
use scholarflux::{
    APIResponse, CacheManager, MultiSearchCoordinator, ProviderInfo, RateLimiterRegistry, ResponseCoordinator,
    RetryConfig, SearchApi, SearchApiConfig, SearchCoordinator,
};
use scholarflux_backend::MemoryBackend;
use scholarflux_core::{DataExtractor, DiscoveryConfig, ExtractionMode, FlattenConfig, KeyFilter, RecursiveDataProcessor};
use scholarflux_providers::APIParameterMap;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn page_processor() -> ResponseCoordinator {
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

fn docs_page(n: usize) -> serde_json::Value {
    let docs: Vec<_> = (0..n).map(|i| serde_json::json!({"title": format!("doc-{i}")})).collect();
    serde_json::json!({ "docs": docs })
}

async fn coordinator_for(server: &MockServer, records_per_page: u32, name: &str, retry: RetryConfig) -> SearchCoordinator {
    let provider = ProviderInfo::new(name, server.uri(), APIParameterMap::new("q", "rows").with_start("start"))
        .unwrap()
        .with_records_per_page(records_per_page)
        .with_request_delay(0.0);
    let config = SearchApiConfig::from_provider(&provider, None).unwrap();
    let limiter = Arc::new(scholarflux::RateLimiter::new(Duration::ZERO));
    let api = SearchApi::new(config, limiter).unwrap();
    SearchCoordinator::new(name.to_owned(), "rust", records_per_page, api, retry, page_processor(), true)
}

/// S1 — single provider, 3 pages of 3 records, a short final page of 2.
/// Requesting pages 1..=4 must yield exactly 3 results and never touch
/// page 4's endpoint.
#[tokio::test]
async fn s1_single_provider_happy_path_stops_before_requesting_page_four() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicU32::new(0));

    struct PagedResponder {
        calls: Arc<AtomicU32>,
    }
    impl Respond for PagedResponder {
        fn respond(&self, _req: &Request) -> ResponseTemplate {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let body = match call {
                0 | 1 => docs_page(3),
                2 => docs_page(2),
                _ => panic!("page 4 should never be requested"),
            };
            ResponseTemplate::new(200).set_body_json(body)
        }
    }
    Mock::given(method("GET"))
        .respond_with(PagedResponder { calls: calls.clone() })
        .mount(&server)
        .await;

    let coordinator = Arc::new(coordinator_for(&server, 3, "plos", RetryConfig::default()).await);
    let results: Vec<_> = coordinator.iter_pages(1, Some(4)).collect().await;

    assert_eq!(results.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// S2 — two coordinators for the same provider, sharing a rate limiter,
/// must serialize 4 concurrent requests at least 3 intervals apart.
#[tokio::test(start_paused = true)]
async fn s2_rate_limit_is_shared_across_coordinators_for_one_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_page(1)))
        .mount(&server)
        .await;

    let registry = RateLimiterRegistry::new();
    let limiter = registry.get_or_insert("x", Duration::from_millis(200));

    let build = |limiter: Arc<scholarflux::RateLimiter>| {
        let provider = ProviderInfo::new("x", server.uri(), APIParameterMap::new("q", "rows").with_start("start")).unwrap();
        let config = SearchApiConfig::from_provider(&provider, None).unwrap();
        let api = SearchApi::new(config, limiter).unwrap();
        SearchCoordinator::new("x", "rust", 25, api, RetryConfig::default(), page_processor(), false, None)
    };
    let coordinator_a = build(limiter.clone());
    let coordinator_b = build(limiter);

    let start = tokio::time::Instant::now();
    let _ = tokio::join!(
        coordinator_a.search(1),
        coordinator_a.search(2),
        coordinator_b.search(1),
        coordinator_b.search(2),
    );
    let elapsed = tokio::time::Instant::now().saturating_duration_since(start);
    assert!(elapsed >= Duration::from_millis(600), "elapsed was {elapsed:?}");
}

/// S3 — a processed-result cache hit must not touch the network.
#[tokio::test]
async fn s3_cache_hit_avoids_network() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicU32::new(0));
    struct FailSecondCall {
        calls: Arc<AtomicU32>,
    }
    impl Respond for FailSecondCall {
        fn respond(&self, _req: &Request) -> ResponseTemplate {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(call, 0, "mock must only be hit once");
            ResponseTemplate::new(200).set_body_json(docs_page(2))
        }
    }
    Mock::given(method("GET"))
        .respond_with(FailSecondCall { calls: calls.clone() })
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server, 25, "plos", RetryConfig::default()).await;

    let first = coordinator.search(1).await;
    let first_processed = first.response.as_processed().unwrap().clone();

    let second = coordinator.search(1).await;
    let second_processed = second.response.as_processed().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first_processed.processed_records, second_processed.processed_records);
    assert!(second_processed.served_from_process_cache);
}

/// S4 — 503, 503, 200 with max_attempts=3 must succeed after exactly two
/// backoff sleeps.
#[tokio::test(start_paused = true)]
async fn s4_retries_twice_then_succeeds() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicU32::new(0));
    struct FlakyResponder {
        calls: Arc<AtomicU32>,
    }
    impl Respond for FlakyResponder {
        fn respond(&self, _req: &Request) -> ResponseTemplate {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                ResponseTemplate::new(503)
            } else {
                ResponseTemplate::new(200).set_body_json(docs_page(1))
            }
        }
    }
    Mock::given(method("GET"))
        .respond_with(FlakyResponder { calls: calls.clone() })
        .mount(&server)
        .await;

    let retry = RetryConfig {
        max_attempts: 3,
        backoff_base: Duration::from_millis(10),
        backoff_cap: Duration::from_secs(1),
        jitter: Duration::ZERO,
        honor_retry_after: false,
    };
    let coordinator = coordinator_for(&server, 25, "flaky", retry).await;

    let result = coordinator.search(1).await;
    assert!(result.response.as_processed().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// S5 — provider A fails permanently on page 1; B and C run all 3 pages.
/// Grouped iteration must yield 1 result for A and 3 each for B and C.
#[tokio::test]
async fn s5_permanent_error_halts_only_the_failing_provider() {
    let server_a = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(401)).mount(&server_a).await;

    let server_b = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_page(5)))
        .mount(&server_b)
        .await;

    let server_c = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_page(5)))
        .mount(&server_c)
        .await;

    let mut multi = MultiSearchCoordinator::new();
    for (label, server) in [("a", &server_a), ("b", &server_b), ("c", &server_c)] {
        let provider = ProviderInfo::new(label, server.uri(), APIParameterMap::new("q", "rows").with_start("start"))
            .unwrap()
            .with_records_per_page(5)
            .with_request_delay(0.0);
        multi
            .register(label, &provider, "rust", None, RetryConfig::default(), page_processor(), false, None)
            .unwrap();
    }

    let results: Vec<_> = multi.iter_pages(3, true).collect().await;

    let count_for = |name: &str| results.iter().filter(|r| r.provider_name == name).count();
    assert_eq!(count_for("a"), 1);
    assert_eq!(count_for("b"), 3);
    assert_eq!(count_for("c"), 3);
    assert!(matches!(
        results.iter().find(|r| r.provider_name == "a").unwrap().response,
        APIResponse::Error(_)
    ));
}

/// S6 — two same-named leaves under different parents disambiguate via
/// last-component expansion rather than colliding.
#[tokio::test]
async fn s6_flattener_disambiguates_same_named_leaves() {
    let coordinator = page_processor();
    let body = serde_json::to_vec(&serde_json::json!({
        "docs": [{"authors": {"name": "X"}, "journal": {"name": "Y"}}]
    }))
    .unwrap();
    let response = coordinator.process("s6", 200, &body, false).await;
    let processed = response.as_processed().unwrap();
    let record = &processed.processed_records[0];

    assert_eq!(
        record.get("authors.name").unwrap().to_display_string(""),
        "X".to_owned()
    );
    assert_eq!(
        record.get("journal.name").unwrap().to_display_string(""),
        "Y".to_owned()
    );
}
