//! The static registry of built-in providers (PLOS, Crossref, CORE,
//! Springer Nature, PubMed), plus lookup by name.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::ProviderError;
use crate::parameter_map::APIParameterMap;
use crate::provider_info::ProviderInfo;

fn plos() -> ProviderInfo {
    ProviderInfo::new(
        "plos",
        "https://api.plos.org/search",
        APIParameterMap::new("q", "rows").with_start("start"),
    )
    .expect("builtin provider URL is always valid")
    .with_records_per_page(50)
    .with_docs_url("https://api.plos.org/solr/faq/")
    .expect("builtin docs URL is always valid")
}

fn springer_nature() -> ProviderInfo {
    ProviderInfo::new(
        "springernature",
        "https://api.springernature.com/meta/v2/json",
        APIParameterMap::new("q", "p").with_start("s").with_api_key("api_key", true),
    )
    .expect("builtin provider URL is always valid")
    .with_docs_url("https://dev.springernature.com/docs/introduction/")
    .expect("builtin docs URL is always valid")
}

fn core() -> ProviderInfo {
    ProviderInfo::new(
        "core",
        "https://api.core.ac.uk/v3/search/works/",
        APIParameterMap::new("q", "limit").with_start("offset").with_api_key("api_key", false),
    )
    .expect("builtin provider URL is always valid")
    .with_docs_url("https://api.core.ac.uk/docs/v3")
    .expect("builtin docs URL is always valid")
}

fn crossref() -> ProviderInfo {
    ProviderInfo::new(
        "crossref",
        "https://api.crossref.org/works",
        APIParameterMap::new("query", "rows")
            .with_start("offset")
            .with_api_key("api_key", false)
            .with_additional_parameter("mailto", "mailto"),
    )
    .expect("builtin provider URL is always valid")
    .with_docs_url("https://www.crossref.org/documentation/retrieve-metadata/rest-api/")
    .expect("builtin docs URL is always valid")
}

fn pubmed() -> ProviderInfo {
    ProviderInfo::new(
        "pubmed",
        "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi",
        APIParameterMap::new("term", "retmax").with_start("retstart").with_api_key("api_key", false),
    )
    .expect("builtin provider URL is always valid")
    .with_docs_url("https://www.ncbi.nlm.nih.gov/books/NBK25501/")
    .expect("builtin docs URL is always valid")
}

static BUILTIN_PROVIDERS: Lazy<HashMap<&'static str, fn() -> ProviderInfo>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, fn() -> ProviderInfo> = HashMap::new();
    m.insert("plos", plos);
    m.insert("springernature", springer_nature);
    m.insert("core", core);
    m.insert("crossref", crossref);
    m.insert("pubmed", pubmed);
    m
});

/// Looks up a built-in provider by name (case-insensitive). Returns a fresh
/// [`ProviderInfo`] each call rather than a shared reference, since callers
/// commonly need to override fields (e.g. supply an API key parameter
/// value) per search.
pub fn lookup(name: &str) -> Result<ProviderInfo, ProviderError> {
    BUILTIN_PROVIDERS
        .get(name.to_lowercase().as_str())
        .map(|factory| factory())
        .ok_or_else(|| ProviderError::UnknownProvider(name.to_owned()))
}

/// Names of every built-in provider, in registration order.
pub fn builtin_names() -> Vec<&'static str> {
    vec!["plos", "springernature", "core", "crossref", "pubmed"]
}

/// Resolves a provider from a request URL by matching its host and path
/// prefix against each registered provider's `base_url`, rather than by
/// name. Useful when a caller only has a URL (e.g. a link discovered in a
/// prior response) and needs to find which provider's parameter map and
/// pagination rules apply to it.
///
/// A provider matches when `url`'s host equals its `base_url`'s host
/// (case-insensitive) and `url`'s path starts with its `base_url`'s path.
/// Builtins are tried in [`builtin_names`] order; the first match wins.
pub fn lookup_by_url(url: &str) -> Result<ProviderInfo, ProviderError> {
    let parsed = url::Url::parse(url).map_err(|_| ProviderError::UnresolvedUrl(url.to_owned()))?;
    for name in builtin_names() {
        let provider = BUILTIN_PROVIDERS[name]();
        let Ok(base) = url::Url::parse(&provider.base_url) else {
            continue;
        };
        let host_matches = parsed.host_str().map(str::to_lowercase) == base.host_str().map(str::to_lowercase);
        let path_matches = parsed.path().starts_with(base.path());
        if host_matches && path_matches {
            return Ok(provider);
        }
    }
    Err(ProviderError::UnresolvedUrl(url.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("PLOS").is_ok());
        assert!(lookup("Crossref").is_ok());
    }

    #[test]
    fn unknown_provider_errors() {
        assert!(lookup("not-a-provider").is_err());
    }

    #[test]
    fn every_builtin_name_resolves() {
        for name in builtin_names() {
            assert!(lookup(name).is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn lookup_by_url_matches_host_and_path_prefix() {
        let provider = lookup_by_url("https://api.plos.org/search?q=rust&rows=10").unwrap();
        assert_eq!(provider.name, "plos");
    }

    #[test]
    fn lookup_by_url_is_case_insensitive_on_host() {
        let provider = lookup_by_url("https://API.PLOS.ORG/search").unwrap();
        assert_eq!(provider.name, "plos");
    }

    #[test]
    fn lookup_by_url_rejects_unmatched_host() {
        assert!(lookup_by_url("https://example.com/search").is_err());
    }

    #[test]
    fn lookup_by_url_rejects_malformed_url() {
        assert!(lookup_by_url("not a url").is_err());
    }
}
