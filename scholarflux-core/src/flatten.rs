//! Flattens a discovered node set into a single-level record, resolving name
//! collisions between sibling leaves that share a group key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::{LeafValue, PathNode};

/// Configuration for [`RecursiveJsonProcessor`].
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// When true, output keys are the full index-bearing dotted path rather
    /// than the collision-resolved group name.
    pub use_full_path: bool,
    pub normalizing_delimiter: String,
    /// When set, scalar-only arrays collapse into one joined string instead
    /// of emitting one field per index. Forwarded to [`crate::discover::PathDiscoverer`].
    pub object_delimiter: Option<String>,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            use_full_path: false,
            normalizing_delimiter: ".".to_owned(),
            object_delimiter: None,
        }
    }
}

/// A flattened field value: a single leaf, or the leaves collapsed from a
/// repeated sibling group (e.g. `authors.N.name` values collected in order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Single(LeafValue),
    Multiple(Vec<LeafValue>),
}

impl FieldValue {
    pub fn to_display_string(&self, delimiter: &str) -> String {
        match self {
            FieldValue::Single(v) => v.to_display_string(),
            FieldValue::Multiple(values) => values
                .iter()
                .map(LeafValue::to_display_string)
                .collect::<Vec<_>>()
                .join(delimiter),
        }
    }
}

/// Flattens a set of [`PathNode`]s discovered from one document into a
/// single ordered map, resolving collisions between paths that share a group
/// key (i.e. differ only in numeric/array-index components).
///
/// Collision resolution: nodes are first grouped by
/// [`ProcessingPath::group_key`]. A group with exactly one member keeps its
/// group key as the output name. A group with multiple members is a repeated
/// sibling shape (e.g. a list of authors) and is collapsed into one
/// [`FieldValue::Multiple`] under the group key — unless `use_full_path` is
/// set, in which case every member keeps its own full dotted path as a
/// distinct key, sidestepping collision entirely.
#[derive(Debug, Default, Clone)]
pub struct RecursiveJsonProcessor {
    config: FlattenConfig,
}

impl RecursiveJsonProcessor {
    pub fn new(config: FlattenConfig) -> Self {
        Self { config }
    }

    pub fn flatten(&self, nodes: Vec<PathNode>) -> indexmap::IndexMap<String, FieldValue> {
        if self.config.use_full_path {
            let mut out = indexmap::IndexMap::new();
            for node in nodes {
                out.insert(node.path.full_path_key(), FieldValue::Single(node.value));
            }
            return out;
        }

        let mut groups: indexmap::IndexMap<String, Vec<PathNode>> = indexmap::IndexMap::new();
        for node in nodes {
            let key = node.path.group_key();
            groups.entry(key).or_default().push(node);
        }

        let names = self.assign_names(groups.keys());
        let mut out = indexmap::IndexMap::new();
        for (group_key, members) in groups {
            let name = names.get(&group_key).cloned().unwrap_or(group_key);
            let value = if members.len() == 1 {
                FieldValue::Single(members.into_iter().next().unwrap().value)
            } else {
                let mut sorted = members;
                sorted.sort_by(|a, b| a.path.cmp(&b.path));
                FieldValue::Multiple(sorted.into_iter().map(|n| n.value).collect())
            };
            out.insert(name, value);
        }
        out
    }

    /// Picks a unique output name per group key, trying the *shortest*
    /// trailing suffix first and growing toward the full dotted key only
    /// where two or more group keys collapse to the same suffix.
    ///
    /// Resolution proceeds level by level (suffix length 1, 2, 3, ...): at
    /// each level every still-unresolved group key computes its candidate
    /// name; a candidate claimed by exactly one group key is assigned, a
    /// candidate claimed by several is deferred so all of them grow one
    /// level longer together. This is order-independent — it matches
    /// `examples/original_source/tests/utils/test_processing_utils.py::test_combine_normalized`,
    /// which expects a lone nested field (`experience.testing`) to resolve
    /// to its last component (`testing`) rather than the full path — while
    /// also guaranteeing that *every* group key sharing a collision grows
    /// together, not just the later ones, which is what a true collision
    /// between sibling groups (e.g. `authors.name` vs `journal.name`) needs.
    /// Once a group key's full length is reached and it is still contested,
    /// falls back to a numeric disambiguator off its last component
    /// (`name.1`, `name.2`, ...).
    fn assign_names<'a>(&self, group_keys: impl Iterator<Item = &'a String>) -> HashMap<String, String> {
        let delim = self.config.normalizing_delimiter.as_str();
        let components: HashMap<&str, Vec<&str>> = group_keys.map(|k| (k.as_str(), k.split(delim).collect())).collect();
        let max_len = components.values().map(|c| c.len()).max().unwrap_or(0);

        let mut assigned: HashMap<String, String> = HashMap::new();
        let mut used: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut pending: Vec<&str> = components.keys().copied().collect();
        pending.sort_unstable();

        for level in 1..=max_len.max(1) {
            if pending.is_empty() {
                break;
            }
            let mut candidates: indexmap::IndexMap<String, Vec<&str>> = indexmap::IndexMap::new();
            for key in &pending {
                let parts = &components[key];
                let suffix_len = level.min(parts.len());
                let candidate = parts[parts.len() - suffix_len..].join(delim);
                candidates.entry(candidate).or_default().push(key);
            }
            let mut next_pending = Vec::new();
            for (candidate, keys) in candidates {
                if keys.len() == 1 && !used.contains(&candidate) {
                    used.insert(candidate.clone());
                    assigned.insert(keys[0].to_owned(), candidate);
                } else {
                    next_pending.extend(keys);
                }
            }
            pending = next_pending;
        }

        for key in pending {
            let base = components[key].last().copied().unwrap_or(key);
            let mut idx = 1usize;
            let name = loop {
                let candidate = format!("{base}{delim}{idx}");
                if !used.contains(&candidate) {
                    used.insert(candidate.clone());
                    break candidate;
                }
                idx += 1;
            };
            assigned.insert(key.to_owned(), name);
        }
        assigned
    }
}

/// Convenience: discover then flatten a raw JSON value in one call.
pub fn flatten_value(
    value: &serde_json::Value,
    discovery: crate::discover::DiscoveryConfig,
    flatten: FlattenConfig,
) -> Result<indexmap::IndexMap<String, FieldValue>, crate::error::ProcessingError> {
    let nodes = crate::discover::PathDiscoverer::new(discovery).discover(value)?;
    Ok(RecursiveJsonProcessor::new(flatten).flatten(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::{DiscoveryConfig, PathDiscoverer};
    use serde_json::json;

    fn flatten_doc(doc: &serde_json::Value) -> indexmap::IndexMap<String, FieldValue> {
        let nodes = PathDiscoverer::new(DiscoveryConfig::default()).discover(doc).unwrap();
        RecursiveJsonProcessor::default().flatten(nodes)
    }

    #[test]
    fn single_field_keeps_group_key_name() {
        let out = flatten_doc(&json!({"title": "hello"}));
        assert_eq!(out.get("title"), Some(&FieldValue::Single(LeafValue::String("hello".into()))));
    }

    #[test]
    fn repeated_sibling_shape_collapses_to_multiple() {
        let out = flatten_doc(&json!({"authors": [{"name": "a"}, {"name": "b"}]}));
        match out.get("name").unwrap() {
            FieldValue::Multiple(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0], LeafValue::String("a".into()));
                assert_eq!(values[1], LeafValue::String("b".into()));
            }
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn non_colliding_nested_field_uses_shortest_suffix() {
        let out = flatten_doc(&json!({"name": "John", "experience": {"testing": null}}));
        assert_eq!(out.get("name"), Some(&FieldValue::Single(LeafValue::String("John".into()))));
        assert_eq!(out.get("testing"), Some(&FieldValue::Single(LeafValue::Null)));
        assert!(!out.contains_key("experience.testing"));
    }

    #[test]
    fn colliding_last_components_both_expand_to_two_components() {
        let out = flatten_doc(&json!({"authors": {"name": "X"}, "journal": {"name": "Y"}}));
        assert_eq!(out.get("authors.name"), Some(&FieldValue::Single(LeafValue::String("X".into()))));
        assert_eq!(out.get("journal.name"), Some(&FieldValue::Single(LeafValue::String("Y".into()))));
        assert!(!out.contains_key("name"));
    }

    #[test]
    fn use_full_path_avoids_collisions_entirely() {
        let nodes = PathDiscoverer::new(DiscoveryConfig::default())
            .discover(&json!({"authors": [{"name": "a"}, {"name": "b"}]}))
            .unwrap();
        let out = RecursiveJsonProcessor::new(FlattenConfig {
            use_full_path: true,
            ..Default::default()
        })
        .flatten(nodes);
        assert!(out.contains_key("authors.0.name"));
        assert!(out.contains_key("authors.1.name"));
    }
}
