//! Builds and sends HTTP requests for one provider, owning its HTTP session
//! and enforcing its shared rate limiter before every send.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scholarflux_providers::{APIParameterMap, ProviderInfo};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api_key::ApiKey;
use crate::error::ConfigError;
use crate::rate_limiter::RateLimiter;

/// Mutable fields a [`SearchApi`] may temporarily override via
/// [`SearchApi::with_config`].
#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    pub base_url: String,
    pub parameter_map: APIParameterMap,
    pub records_per_page: u32,
    pub timeout: Duration,
    pub api_key: Option<ApiKey>,
    pub user_agent: String,
}

impl SearchApiConfig {
    pub fn from_provider(provider: &ProviderInfo, api_key: Option<ApiKey>) -> Result<Self, ConfigError> {
        if provider.parameter_map.api_key_required && api_key.is_none() {
            return Err(ConfigError::MissingApiKey {
                provider: provider.name.clone(),
            });
        }
        Ok(Self {
            base_url: provider.base_url.clone(),
            parameter_map: provider.parameter_map.clone(),
            records_per_page: provider.records_per_page,
            timeout: Duration::from_secs(20),
            api_key,
            user_agent: "scholarflux/0.1".to_owned(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.records_per_page == 0 {
            return Err(ConfigError::NotPositive {
                field: "records_per_page",
                value: self.records_per_page.to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "timeout",
                value: format!("{:?}", self.timeout),
            });
        }
        if self.parameter_map.api_key_required && self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey {
                provider: self.base_url.clone(),
            });
        }
        url::Url::parse(&self.base_url)?;
        Ok(())
    }
}

/// A fetched page: HTTP status, an optional `Retry-After` hint in seconds,
/// and the raw response body.
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: bytes::Bytes,
}

/// Owns one provider's HTTP client and mutable config, and enforces that
/// provider's shared [`RateLimiter`] before every send.
pub struct SearchApi {
    config: Mutex<SearchApiConfig>,
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl SearchApi {
    pub fn new(config: SearchApiConfig, rate_limiter: Arc<RateLimiter>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Mutex::new(config),
            client: reqwest::Client::new(),
            rate_limiter,
        })
    }

    /// Renders the wire parameter map for one page. Pagination math and
    /// API-key insertion happen here; `None`-valued extras are dropped.
    pub async fn build_parameters(&self, page: u32, extra: &HashMap<String, String>) -> indexmap::IndexMap<String, String> {
        let config = self.config.lock().await;
        let query = extra.get("query").map(String::as_str).unwrap_or_default();
        config.parameter_map.build(
            query,
            page,
            config.records_per_page,
            config.api_key.as_ref().map(ApiKey::expose),
            extra,
        )
    }

    /// Sends a GET request. Does not apply rate-limiting or retries — those
    /// live in [`crate::search_coordinator::SearchCoordinator`].
    pub async fn send_request(&self, params: &indexmap::IndexMap<String, String>) -> Result<RawResponse, reqwest::Error> {
        let config = self.config.lock().await;
        let response = self
            .client
            .get(&config.base_url)
            .query(&params.iter().collect::<Vec<_>>())
            .header(reqwest::header::USER_AGENT, &config.user_agent)
            .timeout(config.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.bytes().await?;
        Ok(RawResponse { status, retry_after, body })
    }

    /// Convenience combining a rate-limit wait with [`Self::build_parameters`]
    /// and [`Self::send_request`] for a single page.
    pub async fn search(&self, page: u32, extra: &HashMap<String, String>) -> Result<RawResponse, reqwest::Error> {
        self.rate_limiter.wait().await;
        let params = self.build_parameters(page, extra).await;
        debug!(page, "sending search request");
        self.send_request(&params).await
    }

    /// Temporarily swaps config fields for the duration of `body`, restoring
    /// the prior snapshot once `body` resolves. Unlike a `Drop`-based guard,
    /// a panic inside `body` skips the restore; callers that need panic
    /// safety should catch_unwind around the call.
    pub async fn with_config<F, Fut, T>(&self, modify: impl FnOnce(&mut SearchApiConfig), body: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let snapshot = {
            let mut config = self.config.lock().await;
            let snapshot = config.clone();
            modify(&mut config);
            snapshot
        };
        let result = body().await;
        *self.config.lock().await = snapshot;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarflux_providers::lookup;

    fn test_api() -> SearchApi {
        let provider = lookup("plos").unwrap();
        let config = SearchApiConfig::from_provider(&provider, None).unwrap();
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        SearchApi::new(config, limiter).unwrap()
    }

    #[test]
    fn missing_required_api_key_is_rejected_at_construction() {
        let provider = lookup("springernature").unwrap();
        let result = SearchApiConfig::from_provider(&provider, None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn build_parameters_computes_pagination_offset() {
        let api = test_api();
        let mut extra = HashMap::new();
        extra.insert("query".to_owned(), "rust".to_owned());
        let params = api.build_parameters(2, &extra).await;
        assert_eq!(params.get("start"), Some(&"50".to_owned()));
    }

    #[tokio::test]
    async fn with_config_restores_after_body_completes() {
        let api = test_api();
        let original_rpp = api.config.lock().await.records_per_page;
        api.with_config(
            |config| config.records_per_page = 5,
            || async {},
        )
        .await;
        assert_eq!(api.config.lock().await.records_per_page, original_rpp);
    }
}
