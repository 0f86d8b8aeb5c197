//! Terminal-invariant-enforcing containers of [`PathNode`]s.
//!
//! A [`PathNodeMap`] never stores both a path and one of its ancestors or
//! descendants at once — inserting a path evicts any stored ancestors and
//! rejects the insert if a descendant is already present. This mirrors the
//! "only leaves, never partial subtrees" guarantee `RecursiveJsonProcessor`
//! depends on.

use std::collections::{HashMap, HashSet};

use crate::error::PathError;
use crate::node::{LeafValue, PathNode};
use crate::path::ProcessingPath;

/// A map from path to node enforcing the terminal invariant.
#[derive(Debug, Default, Clone)]
pub struct PathNodeMap {
    nodes: HashMap<ProcessingPath, PathNode>,
    prefix_cache: PrefixCache,
}

impl PathNodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node`, evicting any stored ancestors of its path.
    ///
    /// Returns an error if a descendant of `node.path` is already stored —
    /// the terminal invariant forbids a node and a partial subtree of it
    /// coexisting.
    pub fn insert(&mut self, node: PathNode) -> Result<(), PathError> {
        let path = node.path.clone();
        if self.has_descendant(&path) {
            return Err(PathError::DescendantExists {
                path: path.to_string(),
            });
        }
        let ancestors = self.ancestors_present(&path);
        for ancestor in &ancestors {
            self.nodes.remove(ancestor);
        }
        self.prefix_cache.invalidate();
        self.nodes.insert(path, node);
        Ok(())
    }

    fn has_descendant(&self, path: &ProcessingPath) -> bool {
        self.nodes.keys().any(|existing| path.is_ancestor_of(existing))
    }

    fn ancestors_present(&self, path: &ProcessingPath) -> Vec<ProcessingPath> {
        self.nodes
            .keys()
            .filter(|existing| existing.is_ancestor_of(path))
            .cloned()
            .collect()
    }

    pub fn get(&self, path: &ProcessingPath) -> Option<&PathNode> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathNode> {
        self.nodes.values()
    }

    /// Returns all stored paths under `prefix`, optionally constrained by
    /// depth relative to `prefix`. Results are materialized via the lazy
    /// prefix cache, which is only recomputed after the map changes.
    pub fn filter(
        &mut self,
        prefix: &ProcessingPath,
        min_depth: Option<usize>,
        max_depth: Option<usize>,
    ) -> Vec<&PathNode> {
        let paths = self.prefix_cache.paths_under(prefix, &self.nodes);
        paths
            .into_iter()
            .filter(|p| {
                let relative_depth = p.depth().saturating_sub(prefix.depth());
                min_depth.is_none_or(|min| relative_depth >= min)
                    && max_depth.is_none_or(|max| relative_depth <= max)
            })
            .filter_map(|p| self.nodes.get(&p))
            .collect()
    }

    pub fn values(self) -> impl Iterator<Item = PathNode> {
        self.nodes.into_values()
    }
}

/// Lazily materialized prefix index.
///
/// The reference implementation relies on Python `weakref` dictionaries to
/// cache prefix lookups without pinning the underlying nodes in memory.
/// Rust's ownership model makes that approach awkward, so this substitutes a
/// pending-invalidation flag: lookups after a mutation recompute once and
/// cache until the next mutation, which gives the same amortized behavior
/// without unsafe weak-pointer bookkeeping.
#[derive(Debug, Default, Clone)]
struct PrefixCache {
    dirty: bool,
    cache: HashMap<String, HashSet<ProcessingPath>>,
}

impl PrefixCache {
    fn invalidate(&mut self) {
        self.dirty = true;
        self.cache.clear();
    }

    fn paths_under(
        &mut self,
        prefix: &ProcessingPath,
        nodes: &HashMap<ProcessingPath, PathNode>,
    ) -> Vec<ProcessingPath> {
        let key = prefix.to_string();
        if self.dirty || !self.cache.contains_key(&key) {
            let matches: HashSet<ProcessingPath> = nodes
                .keys()
                .filter(|p| prefix.is_ancestor_of(p) || *p == prefix)
                .cloned()
                .collect();
            self.cache.insert(key.clone(), matches);
            self.dirty = false;
        }
        self.cache.get(&key).cloned().unwrap_or_default().into_iter().collect()
    }
}

/// A [`PathNodeMap`] scoped to a single record index, used when documents are
/// lists of records (e.g. search results) rather than a single object.
#[derive(Debug, Default, Clone)]
pub struct RecordPathNodeMap {
    record_index: usize,
    inner: PathNodeMap,
}

impl RecordPathNodeMap {
    pub fn new(record_index: usize) -> Self {
        Self {
            record_index,
            inner: PathNodeMap::new(),
        }
    }

    pub fn record_index(&self) -> usize {
        self.record_index
    }

    /// Inserts `node`, validating that its path's record index matches this
    /// map's declared index.
    pub fn insert(&mut self, node: PathNode) -> Result<(), PathError> {
        let found = node.path.record_index()?;
        if found != self.record_index {
            return Err(PathError::RecordIndexMismatch {
                expected: self.record_index,
                found,
            });
        }
        self.inner.insert(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathNode> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

/// A collection of [`RecordPathNodeMap`]s keyed by record index, used to
/// process a page of search results as independent per-record subtrees.
#[derive(Debug, Default, Clone)]
pub struct RecordPathChainMap {
    records: HashMap<usize, RecordPathNodeMap>,
}

impl RecordPathChainMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: PathNode) -> Result<(), PathError> {
        let record_index = node.path.record_index()?;
        let record_map = self
            .records
            .entry(record_index)
            .or_insert_with(|| RecordPathNodeMap::new(record_index));
        record_map.insert(node)
    }

    pub fn record(&self, record_index: usize) -> Option<&RecordPathNodeMap> {
        self.records.get(&record_index)
    }

    /// Record indices in ascending order, so callers iterate records in
    /// document order rather than hash order.
    pub fn sorted_record_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.records.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str) -> PathNode {
        PathNode::new(
            ProcessingPath::parse(path, ".").unwrap(),
            LeafValue::String("v".into()),
        )
    }

    #[test]
    fn insert_evicts_stored_ancestor() {
        let mut map = PathNodeMap::new();
        map.insert(node("a")).unwrap();
        assert_eq!(map.len(), 1);
        map.insert(node("a.b")).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.get(&ProcessingPath::parse("a", ".").unwrap()).is_none());
    }

    #[test]
    fn insert_rejects_existing_descendant() {
        let mut map = PathNodeMap::new();
        map.insert(node("a.b")).unwrap();
        assert!(map.insert(node("a")).is_err());
    }

    #[test]
    fn filter_honors_depth_bounds() {
        let mut map = PathNodeMap::new();
        map.insert(node("a.b.c")).unwrap();
        map.insert(node("a.x")).unwrap();
        let prefix = ProcessingPath::parse("a", ".").unwrap();
        let results = map.filter(&prefix, Some(1), Some(1));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn record_chain_groups_by_index() {
        let mut chain = RecordPathChainMap::new();
        chain.insert(node("0.title")).unwrap();
        chain.insert(node("1.title")).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.sorted_record_indices(), vec![0, 1]);
    }
}
