//! The sum type over the outcome of one page retrieval, plus the ordered
//! collections coordinators accumulate them into.

use chrono::{DateTime, Utc};
use scholarflux_core::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A successfully parsed, extracted, and processed page.
///
/// Serializable: this is the shape persisted verbatim into the processed-
/// result cache tier, so a cache hit can reconstruct it without re-running
/// extraction/processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedResponse {
    pub cache_key: String,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
    /// Whether the raw HTTP body this response was built from came from the
    /// request-cache tier rather than the network. `false` when this
    /// response was reconstructed directly from the process cache (the
    /// pipeline never ran, so the request tier was never consulted).
    pub served_from_request_cache: bool,
    /// Whether this entire response was reconstructed from the
    /// processed-result cache tier rather than running the parse/extract/
    /// process/normalize pipeline. Independent of `served_from_request_cache`
    /// — a process-cache hit never touches the request tier at all.
    pub served_from_process_cache: bool,
    pub parsed_response: serde_json::Value,
    pub extracted_records: Vec<serde_json::Value>,
    pub processed_records: Vec<indexmap::IndexMap<String, FieldValue>>,
    pub normalized_records: Vec<indexmap::IndexMap<String, FieldValue>>,
    pub metadata: indexmap::IndexMap<String, serde_json::Value>,
    pub processed_metadata: indexmap::IndexMap<String, FieldValue>,
}

/// A page that failed permanently, or whose pipeline raised mid-processing.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub cache_key: String,
    pub status_code: Option<u16>,
    pub created_at: DateTime<Utc>,
    pub served_from_request_cache: bool,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_pipeline_error(cache_key: impl Into<String>, status_code: Option<u16>, error: PipelineError) -> Self {
        Self {
            cache_key: cache_key.into(),
            status_code,
            created_at: Utc::now(),
            served_from_request_cache: false,
            message: error.to_string(),
            error: match &error {
                PipelineError::DataParsing(_) => "DataParsingError".to_owned(),
                PipelineError::Processing(_) => "ProcessingError".to_owned(),
                PipelineError::Normalization(_) => "NormalizationError".to_owned(),
            },
        }
    }
}

/// No HTTP call was ever made for this page (e.g. the coordinator decided
/// not to request it because a prior page in the same run already
/// terminated the sequence).
#[derive(Debug, Clone)]
pub struct NonResponse {
    pub cache_key: String,
    pub created_at: DateTime<Utc>,
    pub reason: String,
}

/// The outcome of one page retrieval attempt.
#[derive(Debug, Clone)]
pub enum APIResponse {
    Processed(Box<ProcessedResponse>),
    Error(ErrorResponse),
    Non(NonResponse),
}

impl APIResponse {
    pub fn cache_key(&self) -> &str {
        match self {
            APIResponse::Processed(r) => &r.cache_key,
            APIResponse::Error(r) => &r.cache_key,
            APIResponse::Non(r) => &r.cache_key,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            APIResponse::Processed(r) => r.created_at,
            APIResponse::Error(r) => r.created_at,
            APIResponse::Non(r) => r.created_at,
        }
    }

    pub fn as_processed(&self) -> Option<&ProcessedResponse> {
        match self {
            APIResponse::Processed(r) => Some(r),
            _ => None,
        }
    }

    pub fn record_count(&self) -> usize {
        self.as_processed().map(|r| r.processed_records.len()).unwrap_or(0)
    }
}

/// One page's result, tagged with the query context that produced it.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub page: u32,
    pub query: String,
    pub provider_name: String,
    pub response: APIResponse,
}

/// An ordered collection of [`SearchResult`]s accumulated across pages
/// and/or providers.
#[derive(Debug, Clone, Default)]
pub struct SearchResultList {
    results: Vec<SearchResult>,
}

impl SearchResultList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: SearchResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter()
    }

    /// Retains only results carrying a [`ProcessedResponse`], dropping
    /// errors and non-responses.
    pub fn filter(&self) -> Vec<&SearchResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.response, APIResponse::Processed(_)))
            .collect()
    }

    /// Flattens every processed result's records into one list, deduplicated
    /// by `id` field within the merge (intra-page dedup only — no
    /// cross-provider bibliographic dedup).
    pub fn join(&self) -> Vec<indexmap::IndexMap<String, FieldValue>> {
        let mut seen_ids = std::collections::HashSet::new();
        let mut out = Vec::new();
        for result in &self.results {
            let Some(processed) = result.response.as_processed() else {
                continue;
            };
            for record in &processed.processed_records {
                let id = record.get("id").map(|v| v.to_display_string(""));
                if let Some(id) = &id {
                    if !seen_ids.insert(id.clone()) {
                        continue;
                    }
                }
                out.push(record.clone());
            }
        }
        out
    }
}
