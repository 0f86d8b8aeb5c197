//! Converts a single raw record (one element of the list [`crate::extractor::DataExtractor`]
//! locates) into a flat field map, using one of three strategies.

use std::collections::HashSet;

use serde_json::Value;

use crate::discover::{DiscoveryConfig, PathDiscoverer};
use crate::error::ProcessingError;
use crate::flatten::{FieldValue, FlattenConfig, RecursiveJsonProcessor};
use crate::node::LeafValue;

/// Which record fields to retain after processing. Mutually exclusive with
/// `ignore`, where both are provided `keep` takes precedence.
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    pub keep_keys: Option<HashSet<String>>,
    pub ignore_keys: HashSet<String>,
}

impl KeyFilter {
    fn retains(&self, key: &str) -> bool {
        if let Some(keep) = &self.keep_keys {
            return keep.contains(key);
        }
        !self.ignore_keys.contains(key)
    }

    fn apply(&self, map: indexmap::IndexMap<String, FieldValue>) -> indexmap::IndexMap<String, FieldValue> {
        map.into_iter().filter(|(k, _)| self.retains(k)).collect()
    }
}

/// Declares where each named output field comes from when extraction is
/// path-driven rather than a full recursive flatten.
#[derive(Debug, Clone)]
pub enum RecordKeys {
    /// A flat list of dotted paths; the output field name is the path's
    /// final component.
    Paths(Vec<String>),
    /// An explicit output-name to source-path mapping.
    Named(indexmap::IndexMap<String, String>),
}

/// Shared behavior for turning one raw record into a flat field map.
pub trait RecordProcessor {
    fn process(&self, record: &Value) -> Result<indexmap::IndexMap<String, FieldValue>, ProcessingError>;
}

/// Reads a fixed, explicitly declared set of dotted paths out of each
/// record. The fastest and least surprising strategy; best suited to
/// providers whose response shape is well known and stable.
#[derive(Debug, Clone)]
pub struct ExplicitFieldProcessor {
    pub keys: RecordKeys,
    pub delimiter: String,
    pub filter: KeyFilter,
}

impl RecordProcessor for ExplicitFieldProcessor {
    fn process(&self, record: &Value) -> Result<indexmap::IndexMap<String, FieldValue>, ProcessingError> {
        let mut out = indexmap::IndexMap::new();
        let pairs: Vec<(String, String)> = match &self.keys {
            RecordKeys::Paths(paths) => paths
                .iter()
                .map(|p| {
                    let name = p.rsplit(&self.delimiter).next().unwrap_or(p).to_owned();
                    (name, p.clone())
                })
                .collect(),
            RecordKeys::Named(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        for (name, path) in pairs {
            if let Some(value) = get_nested(record, &path, &self.delimiter) {
                let leaf = LeafValue::try_from(value.clone())?;
                out.insert(name, FieldValue::Single(leaf));
            }
        }
        Ok(self.filter.apply(out))
    }
}

/// Recursively discovers and flattens every leaf in the record, resolving
/// collisions the way [`RecursiveJsonProcessor`] does. Best suited to
/// providers whose response shape is irregular or unknown ahead of time.
#[derive(Debug, Clone)]
pub struct RecursiveDataProcessor {
    pub discovery: DiscoveryConfig,
    pub flatten: FlattenConfig,
    pub filter: KeyFilter,
}

impl RecordProcessor for RecursiveDataProcessor {
    fn process(&self, record: &Value) -> Result<indexmap::IndexMap<String, FieldValue>, ProcessingError> {
        let nodes = PathDiscoverer::new(self.discovery.clone()).discover(record)?;
        let flat = RecursiveJsonProcessor::new(self.flatten.clone()).flatten(nodes);
        Ok(self.filter.apply(flat))
    }
}

/// Discovers every leaf via [`PathDiscoverer`] but groups them through a
/// [`crate::node_map::RecordPathChainMap`] rather than the flattener's
/// group-key collapse, preserving per-path addressability while still
/// enforcing the terminal invariant. Useful when downstream code needs to
/// re-query specific leaves by path after processing.
#[derive(Debug, Clone)]
pub struct PathDataProcessor {
    pub discovery: DiscoveryConfig,
    pub normalizing_delimiter: String,
    pub filter: KeyFilter,
}

impl RecordProcessor for PathDataProcessor {
    fn process(&self, record: &Value) -> Result<indexmap::IndexMap<String, FieldValue>, ProcessingError> {
        let nodes = PathDiscoverer::new(self.discovery.clone()).discover(record)?;
        let mut map = crate::node_map::PathNodeMap::new();
        for node in nodes {
            map.insert(node)?;
        }
        let mut out = indexmap::IndexMap::new();
        for node in map.values() {
            let key = node.path.full_path_key().replace('.', &self.normalizing_delimiter);
            out.insert(key, FieldValue::Single(node.value));
        }
        Ok(self.filter.apply(out))
    }
}

fn get_nested<'a>(body: &'a Value, dotted_path: &str, delimiter: &str) -> Option<&'a Value> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_processor_reads_declared_paths() {
        let processor = ExplicitFieldProcessor {
            keys: RecordKeys::Paths(vec!["title".to_owned(), "author.name".to_owned()]),
            delimiter: ".".to_owned(),
            filter: KeyFilter::default(),
        };
        let record = json!({"title": "t", "author": {"name": "a"}});
        let out = processor.process(&record).unwrap();
        assert_eq!(out.get("title"), Some(&FieldValue::Single(LeafValue::String("t".into()))));
        assert_eq!(out.get("name"), Some(&FieldValue::Single(LeafValue::String("a".into()))));
    }

    #[test]
    fn recursive_processor_flattens_whole_record() {
        let processor = RecursiveDataProcessor {
            discovery: DiscoveryConfig::default(),
            flatten: FlattenConfig::default(),
            filter: KeyFilter::default(),
        };
        let record = json!({"title": "t", "tags": ["a", "b"]});
        let out = processor.process(&record).unwrap();
        assert!(out.contains_key("title"));
    }

    #[test]
    fn key_filter_keep_list_takes_precedence() {
        let filter = KeyFilter {
            keep_keys: Some(["title".to_owned()].into_iter().collect()),
            ignore_keys: ["title".to_owned()].into_iter().collect(),
        };
        let mut map = indexmap::IndexMap::new();
        map.insert("title".to_owned(), FieldValue::Single(LeafValue::Null));
        map.insert("other".to_owned(), FieldValue::Single(LeafValue::Null));
        let out = filter.apply(map);
        assert!(out.contains_key("title"));
        assert!(!out.contains_key("other"));
    }

    #[test]
    fn path_processor_preserves_full_paths() {
        let processor = PathDataProcessor {
            discovery: DiscoveryConfig::default(),
            normalizing_delimiter: ".".to_owned(),
            filter: KeyFilter::default(),
        };
        let record = json!({"authors": [{"name": "a"}, {"name": "b"}]});
        let out = processor.process(&record).unwrap();
        assert!(out.contains_key("authors.0.name"));
        assert!(out.contains_key("authors.1.name"));
    }
}
