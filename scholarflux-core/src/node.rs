//! Leaf values and the path/value pairs produced by document discovery.

use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;
use crate::path::ProcessingPath;

/// A scalar value found at the leaf of a document. Containers (`Array`,
/// `Object`) never reach this type — discovery only emits leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeafValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Raw bytes, not produced by JSON discovery but available for
    /// processors that synthesize binary fields.
    Bytes(Vec<u8>),
}

impl LeafValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LeafValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as a display string, used when flattening
    /// collapses multiple leaves into a delimiter-joined scalar.
    pub fn to_display_string(&self) -> String {
        match self {
            LeafValue::Null => String::new(),
            LeafValue::Bool(b) => b.to_string(),
            LeafValue::Number(n) => n.to_string(),
            LeafValue::String(s) => s.clone(),
            LeafValue::Bytes(b) => base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b),
        }
    }
}

impl TryFrom<serde_json::Value> for LeafValue {
    type Error = ProcessingError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(LeafValue::Null),
            serde_json::Value::Bool(b) => Ok(LeafValue::Bool(b)),
            serde_json::Value::Number(n) => Ok(LeafValue::Number(n)),
            serde_json::Value::String(s) => Ok(LeafValue::String(s)),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(ProcessingError::NotALeaf {
                    path: String::new(),
                })
            }
        }
    }
}

impl From<&LeafValue> for serde_json::Value {
    fn from(value: &LeafValue) -> Self {
        match value {
            LeafValue::Null => serde_json::Value::Null,
            LeafValue::Bool(b) => serde_json::Value::Bool(*b),
            LeafValue::Number(n) => serde_json::Value::Number(n.clone()),
            LeafValue::String(s) => serde_json::Value::String(s.clone()),
            LeafValue::Bytes(b) => serde_json::Value::String(format!(
                "base64:{}",
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)
            )),
        }
    }
}

/// A discovered leaf: the path that addresses it plus its scalar value.
///
/// Identity (`Eq`/`Hash`) is defined solely by `path` — two nodes at the same
/// path are the same node, regardless of the value carried, matching the
/// terminal-invariant bookkeeping in [`crate::node_map::PathNodeMap`].
#[derive(Debug, Clone)]
pub struct PathNode {
    pub path: ProcessingPath,
    pub value: LeafValue,
}

impl PathNode {
    pub fn new(path: ProcessingPath, value: LeafValue) -> Self {
        Self { path, value }
    }
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for PathNode {}

impl std::hash::Hash for PathNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}
