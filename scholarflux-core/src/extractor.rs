//! Locates the list of per-record objects inside a provider's raw response
//! payload, either at a declared path or by searching for it.

use serde_json::Value;
use tracing::debug;

use crate::path::ProcessingPath;

/// How a [`DataExtractor`] locates the record list within a response body.
#[derive(Debug, Clone)]
pub enum ExtractionMode {
    /// The record list and any sibling metadata live at fixed dotted paths.
    Static {
        record_path: String,
        metadata_paths: Vec<String>,
    },
    /// Search the document for the shallowest array of objects with more
    /// than one element, folding scalar siblings into metadata.
    Dynamic,
}

/// Splits a raw response body into a record list plus top-level metadata.
#[derive(Debug, Clone)]
pub struct DataExtractor {
    mode: ExtractionMode,
    delimiter: String,
}

/// The outcome of extracting records from a response body.
#[derive(Debug, Clone, Default)]
pub struct ExtractedData {
    pub records: Vec<Value>,
    pub metadata: indexmap::IndexMap<String, Value>,
}

impl DataExtractor {
    pub fn new(mode: ExtractionMode, delimiter: impl Into<String>) -> Self {
        Self {
            mode,
            delimiter: delimiter.into(),
        }
    }

    /// Extracts records from `body`. Never fails: ambiguous or missing
    /// shapes are logged and return an empty [`ExtractedData`] rather than
    /// propagating an error, since a single malformed page should not abort
    /// an entire multi-page search.
    pub fn extract(&self, body: &Value) -> ExtractedData {
        match &self.mode {
            ExtractionMode::Static {
                record_path,
                metadata_paths,
            } => self.extract_static(body, record_path, metadata_paths),
            ExtractionMode::Dynamic => self.extract_dynamic(body),
        }
    }

    fn extract_static(
        &self,
        body: &Value,
        record_path: &str,
        metadata_paths: &[String],
    ) -> ExtractedData {
        let records = match get_nested(body, record_path, &self.delimiter) {
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                debug!(record_path, "declared record path is not an array");
                Vec::new()
            }
            None => {
                debug!(record_path, "declared record path not found in response");
                Vec::new()
            }
        };
        let mut metadata = indexmap::IndexMap::new();
        for path in metadata_paths {
            if let Some(value) = get_nested(body, path, &self.delimiter) {
                metadata.insert(path.clone(), value.clone());
            }
        }
        ExtractedData { records, metadata }
    }

    fn extract_dynamic(&self, body: &Value) -> ExtractedData {
        let root = match ProcessingPath::root_with_delimiter(&self.delimiter) {
            Ok(root) => root,
            Err(_) => return ExtractedData::default(),
        };
        let mut candidates: Vec<(usize, &Value)> = Vec::new();
        collect_record_list_candidates(body, 0, &mut candidates);
        candidates.sort_by_key(|(depth, _)| *depth);

        let Some((_, records_value)) = candidates.into_iter().next() else {
            debug!("dynamic extraction found no array-of-objects candidate");
            return ExtractedData::default();
        };
        let Value::Array(records) = records_value else {
            return ExtractedData::default();
        };

        let first_keys: Option<std::collections::HashSet<&String>> = records
            .first()
            .and_then(|v| v.as_object())
            .map(|m| m.keys().collect());
        if first_keys.is_none_or(|keys| keys.is_empty()) {
            debug!("dynamic extraction candidate record has no object fields");
            return ExtractedData::default();
        }

        let mut metadata = indexmap::IndexMap::new();
        if let Value::Object(map) = body {
            for (key, value) in map {
                if !matches!(value, Value::Array(_) | Value::Object(_)) {
                    metadata.insert(key.clone(), value.clone());
                }
            }
        }
        let _ = root;
        ExtractedData {
            records: records.clone(),
            metadata,
        }
    }
}

/// Recursively finds arrays whose elements are all objects and whose length
/// exceeds one, recording the depth at which each was found.
fn collect_record_list_candidates<'a>(value: &'a Value, depth: usize, out: &mut Vec<(usize, &'a Value)>) {
    match value {
        Value::Array(items) if items.len() > 1 && items.iter().all(|v| v.is_object()) => {
            out.push((depth, value));
        }
        Value::Array(items) => {
            for item in items {
                collect_record_list_candidates(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                collect_record_list_candidates(child, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn get_nested<'a>(body: &'a Value, dotted_path: &str, delimiter: &str) -> Option<&'a Value> {
    if dotted_path.is_empty() {
        return Some(body);
    }
    let mut current = body;
    for component in dotted_path.split(delimiter) {
        current = match current {
            Value::Object(map) => map.get(component)?,
            Value::Array(items) => items.get(component.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
