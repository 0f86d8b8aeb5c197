//! Runs one page's body through parse -> extract -> process -> normalize,
//! and reads/writes the processed-result cache around that pipeline.

use std::sync::Arc;

use chrono::Utc;
use scholarflux_backend::{CacheEntry, CacheError, CacheManager};
use scholarflux_core::{DataExtractor, FieldValue, LeafValue, Normalizer, RecordProcessor};
use serde_json::Value;
use tracing::warn;

use crate::error::PipelineError;
use crate::response::{ErrorResponse, ProcessedResponse};

/// Everything needed to turn a raw response body into a [`ProcessedResponse`],
/// plus the cache it reads from and writes through to.
pub struct ResponseCoordinator {
    extractor: DataExtractor,
    processor: Arc<dyn RecordProcessor + Send + Sync>,
    normalizer: Option<Normalizer>,
    cache: Arc<CacheManager>,
    cache_ttl: Option<chrono::Duration>,
}

impl ResponseCoordinator {
    pub fn new(
        extractor: DataExtractor,
        processor: Arc<dyn RecordProcessor + Send + Sync>,
        normalizer: Option<Normalizer>,
        cache: Arc<CacheManager>,
        cache_ttl: Option<chrono::Duration>,
    ) -> Self {
        Self {
            extractor,
            processor,
            normalizer,
            cache,
            cache_ttl,
        }
    }

    /// Looks up `cache_key` in the processed-result cache, reconstructing a
    /// full [`ProcessedResponse`] from its stored blob on a hit. This skips
    /// the parse/extract/process/normalize pipeline entirely, so the
    /// reconstructed response never touched the request-cache tier this
    /// call — `served_from_request_cache` is left `false`.
    pub async fn lookup_cache(&self, cache_key: &str) -> Result<Option<ProcessedResponse>, CacheError> {
        let Some(entry) = self.cache.get(cache_key).await? else {
            return Ok(None);
        };
        let mut response: ProcessedResponse = serde_json::from_slice(&entry.blob)?;
        response.served_from_request_cache = false;
        response.served_from_process_cache = true;
        Ok(Some(response))
    }

    /// Runs the full pipeline over a freshly fetched body and writes the
    /// result through to the cache. Never panics and never propagates a
    /// pipeline failure to the caller — a parse, processing, or
    /// normalization error becomes an [`crate::response::APIResponse::Error`]
    /// so one malformed page cannot abort an entire multi-page run.
    pub async fn process(
        &self,
        cache_key: &str,
        status_code: u16,
        body: &[u8],
        served_from_request_cache: bool,
    ) -> crate::response::APIResponse {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                return crate::response::APIResponse::Error(ErrorResponse::from_pipeline_error(
                    cache_key,
                    Some(status_code),
                    PipelineError::DataParsing(e.to_string()),
                ));
            }
        };

        let extracted = self.extractor.extract(&parsed);

        let mut processed_records = Vec::with_capacity(extracted.records.len());
        for record in &extracted.records {
            match self.processor.process(record) {
                Ok(fields) => processed_records.push(fields),
                Err(e) => {
                    return crate::response::APIResponse::Error(ErrorResponse::from_pipeline_error(
                        cache_key,
                        Some(status_code),
                        PipelineError::Processing(e),
                    ));
                }
            }
        }

        let normalized_records = match &self.normalizer {
            Some(normalizer) => {
                let mut out = Vec::with_capacity(processed_records.len());
                for record in &processed_records {
                    match normalizer.normalize(record) {
                        Ok(normalized) => out.push(normalized),
                        Err(e) => {
                            return crate::response::APIResponse::Error(ErrorResponse::from_pipeline_error(
                                cache_key,
                                Some(status_code),
                                PipelineError::Normalization(e),
                            ));
                        }
                    }
                }
                out
            }
            None => processed_records.clone(),
        };

        let processed_metadata = metadata_to_fields(&extracted.metadata);

        let response = ProcessedResponse {
            cache_key: cache_key.to_owned(),
            status_code,
            created_at: Utc::now(),
            served_from_request_cache,
            served_from_process_cache: false,
            parsed_response: parsed,
            extracted_records: extracted.records,
            processed_records,
            normalized_records,
            metadata: extracted.metadata,
            processed_metadata,
        };

        if let Err(e) = self.write_through(cache_key, &response).await {
            warn!(cache_key, error = %e, "failed to write processed response to cache");
        }

        crate::response::APIResponse::Processed(Box::new(response))
    }

    async fn write_through(&self, cache_key: &str, response: &ProcessedResponse) -> Result<(), CacheError> {
        let blob = serde_json::to_vec(response)?;
        let entry = CacheEntry::new(blob, self.cache_ttl);
        self.cache.set(cache_key, entry).await
    }
}

/// Converts top-level response metadata (raw JSON scalars) into the
/// [`FieldValue`] shape used everywhere else, dropping any metadata value
/// that is itself a container (arrays/objects are not expected at this
/// level; if a provider puts one there it is simply omitted).
fn metadata_to_fields(metadata: &indexmap::IndexMap<String, Value>) -> indexmap::IndexMap<String, FieldValue> {
    let mut out = indexmap::IndexMap::new();
    for (key, value) in metadata {
        if let Ok(leaf) = LeafValue::try_from(value.clone()) {
            out.insert(key.clone(), FieldValue::Single(leaf));
        }
    }
    out
}
