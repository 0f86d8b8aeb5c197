//! Depth-first discovery of leaf nodes inside a JSON document.

use serde_json::Value;
use tracing::warn;

use crate::error::ProcessingError;
use crate::node::{LeafValue, PathNode};
use crate::path::ProcessingPath;

/// Configuration controlling how a document is walked.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub delimiter: String,
    /// Containers deeper than this are dropped entirely rather than
    /// truncated into a synthetic leaf.
    pub max_depth: Option<usize>,
    /// When set, an array whose every element is a leaf is joined into a
    /// single string using this delimiter instead of producing one path per
    /// index.
    pub object_delimiter: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            delimiter: crate::path::DEFAULT_DELIMITER.to_owned(),
            max_depth: None,
            object_delimiter: None,
        }
    }
}

/// Walks a [`serde_json::Value`] depth-first, emitting one [`PathNode`] per
/// scalar leaf in document order.
#[derive(Debug, Clone, Default)]
pub struct PathDiscoverer {
    config: DiscoveryConfig,
}

impl PathDiscoverer {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn discover(&self, value: &Value) -> Result<Vec<PathNode>, ProcessingError> {
        let root = ProcessingPath::root_with_delimiter(&self.config.delimiter)?;
        let mut out = Vec::new();
        self.walk(&root, value, 0, &mut out)?;
        Ok(out)
    }

    fn walk(
        &self,
        path: &ProcessingPath,
        value: &Value,
        depth: usize,
        out: &mut Vec<PathNode>,
    ) -> Result<(), ProcessingError> {
        if let Some(max_depth) = self.config.max_depth {
            if depth > max_depth {
                warn!(path = %path, depth, max_depth, "dropping subtree past max_depth");
                return Ok(());
            }
        }

        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = path.append(key.clone());
                    self.walk(&child_path, child, depth + 1, out)?;
                }
                Ok(())
            }
            Value::Array(items) => {
                if let Some(object_delimiter) = &self.config.object_delimiter {
                    if items.iter().all(is_leaf) {
                        let joined = items
                            .iter()
                            .map(|v| LeafValue::try_from(v.clone()))
                            .collect::<Result<Vec<_>, _>>()?
                            .iter()
                            .map(LeafValue::to_display_string)
                            .collect::<Vec<_>>()
                            .join(object_delimiter);
                        out.push(PathNode::new(path.clone(), LeafValue::String(joined)));
                        return Ok(());
                    }
                }
                for (index, child) in items.iter().enumerate() {
                    let child_path = path.append(index.to_string());
                    self.walk(&child_path, child, depth + 1, out)?;
                }
                Ok(())
            }
            leaf => {
                let leaf_value = LeafValue::try_from(leaf.clone())?;
                out.push(PathNode::new(path.clone(), leaf_value));
                Ok(())
            }
        }
    }
}

fn is_leaf(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
