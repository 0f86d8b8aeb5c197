//! Human-readable and operational metadata for a registered provider.

use crate::error::ProviderError;
use crate::parameter_map::APIParameterMap;

/// Full configuration for a single search provider: its parameter map plus
/// the operational defaults (base URL, page size, rate limit) the
/// scheduler and HTTP layer need.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub base_url: String,
    pub parameter_map: APIParameterMap,
    pub records_per_page: u32,
    /// Minimum seconds between two requests to this provider, the input to
    /// `scholarflux::RateLimiter`.
    pub request_delay: f64,
    pub docs_url: Option<String>,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, parameter_map: APIParameterMap) -> Result<Self, ProviderError> {
        let name = name.into();
        let base_url = base_url.into();
        validate_url(&name, &base_url)?;
        Ok(Self {
            name,
            base_url,
            parameter_map,
            records_per_page: 25,
            request_delay: 6.1,
            docs_url: None,
        })
    }

    pub fn with_records_per_page(mut self, records_per_page: u32) -> Self {
        self.records_per_page = records_per_page;
        self
    }

    pub fn with_request_delay(mut self, request_delay: f64) -> Self {
        self.request_delay = request_delay;
        self
    }

    pub fn with_docs_url(mut self, docs_url: impl Into<String>) -> Result<Self, ProviderError> {
        let docs_url = docs_url.into();
        validate_url(&self.name, &docs_url)?;
        self.docs_url = Some(docs_url);
        Ok(self)
    }
}

fn validate_url(provider: &str, url: &str) -> Result<(), ProviderError> {
    url::Url::parse(url).map(|_| ()).map_err(|_| ProviderError::InvalidUrl {
        provider: provider.to_owned(),
        url: url.to_owned(),
    })
}
