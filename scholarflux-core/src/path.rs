//! Immutable dotted-path value type used to address leaves inside arbitrarily
//! nested JSON documents.
//!
//! Mirrors the role `hitbox_core::CacheKey` plays for cache identity, but
//! addresses positions *inside* a document rather than a request.

use std::fmt;
use std::sync::Arc;

use crate::error::PathError;

const RESERVED_CHARS: &[char] = &['\\', '/', ':', '<', '>', '|', '.', '%'];

/// Default delimiter used when none is supplied. Itself a reserved character,
/// which is why delimiter validation special-cases single reserved-char
/// delimiters — see [`ProcessingPath::validate_delimiter`].
pub const DEFAULT_DELIMITER: &str = ".";

/// An immutable, ordered sequence of string components addressing a position
/// inside a nested document.
///
/// The root path is the sentinel single component `[""]`. Non-root paths
/// never contain empty components. Cloning is cheap: components are stored
/// behind an [`Arc`].
#[derive(Clone, Debug)]
pub struct ProcessingPath {
    components: Arc<Vec<String>>,
    delimiter: Arc<str>,
}

impl ProcessingPath {
    /// The sentinel root path `[""]`.
    pub fn root() -> Self {
        Self::root_with_delimiter(DEFAULT_DELIMITER).expect("default delimiter is always valid")
    }

    /// The sentinel root path with a custom delimiter.
    pub fn root_with_delimiter(delimiter: impl AsRef<str>) -> Result<Self, PathError> {
        let delimiter = Self::validate_delimiter(delimiter.as_ref())?;
        Ok(Self {
            components: Arc::new(vec![String::new()]),
            delimiter: Arc::from(delimiter),
        })
    }

    /// Builds a path from an explicit list of components.
    ///
    /// `components` must be non-empty strings, except that the single
    /// element `[""]` denotes the root.
    pub fn from_components(
        components: Vec<String>,
        delimiter: impl AsRef<str>,
    ) -> Result<Self, PathError> {
        let delimiter = Self::validate_delimiter(delimiter.as_ref())?;
        if components.is_empty() || components == [String::new()] {
            return Ok(Self {
                components: Arc::new(vec![String::new()]),
                delimiter: Arc::from(delimiter),
            });
        }
        for (index, component) in components.iter().enumerate() {
            if component.trim().is_empty() {
                return Err(PathError::EmptyComponent { index });
            }
        }
        Ok(Self {
            components: Arc::new(components),
            delimiter: Arc::from(delimiter),
        })
    }

    /// Parses a delimiter-joined string into a path.
    pub fn parse(path: &str, delimiter: impl AsRef<str>) -> Result<Self, PathError> {
        let delimiter_str = Self::validate_delimiter(delimiter.as_ref())?;
        if path.is_empty() {
            return Self::root_with_delimiter(&delimiter_str);
        }
        let components: Vec<String> = path.split(delimiter_str.as_str()).map(String::from).collect();
        Self::from_components(components, delimiter_str)
    }

    fn validate_delimiter(delimiter: &str) -> Result<String, PathError> {
        if delimiter.is_empty() {
            return Err(PathError::InvalidDelimiter {
                delimiter: delimiter.to_owned(),
                reason: "delimiter must be a non-empty string".into(),
            });
        }
        if delimiter.chars().all(char::is_whitespace) {
            return Err(PathError::InvalidDelimiter {
                delimiter: delimiter.to_owned(),
                reason: "delimiter must not be a whitespace character".into(),
            });
        }
        let mut chars = delimiter.chars();
        let is_single_reserved = delimiter.chars().count() == 1
            && chars.next().is_some_and(|c| RESERVED_CHARS.contains(&c));
        let contains_reserved = delimiter.chars().any(|c| RESERVED_CHARS.contains(&c));
        if contains_reserved && !is_single_reserved {
            return Err(PathError::InvalidDelimiter {
                delimiter: delimiter.to_owned(),
                reason: format!(
                    "delimiter must not contain reserved characters {:?} unless it is exactly one of them",
                    RESERVED_CHARS
                ),
            });
        }
        Ok(delimiter.to_owned())
    }

    /// Whether this path is the sentinel root.
    pub fn is_root(&self) -> bool {
        self.components.len() == 1 && self.components[0].is_empty()
    }

    /// The path's components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The delimiter used when joining/splitting this path.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Depth (number of components); the root has depth 0.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.components.len()
        }
    }

    /// Returns a new path with `component` appended.
    pub fn append(&self, component: impl Into<String>) -> Self {
        let mut components: Vec<String> = if self.is_root() {
            Vec::new()
        } else {
            self.components.as_ref().clone()
        };
        components.push(component.into());
        Self {
            components: Arc::new(components),
            delimiter: Arc::clone(&self.delimiter),
        }
    }

    /// Returns the parent path, or `None` if this path is already the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        if self.components.len() == 1 {
            return Some(Self {
                components: Arc::new(vec![String::new()]),
                delimiter: Arc::clone(&self.delimiter),
            });
        }
        let components = self.components[..self.components.len() - 1].to_vec();
        Some(Self {
            components: Arc::new(components),
            delimiter: Arc::clone(&self.delimiter),
        })
    }

    /// True if `self` is a strict ancestor of `other` (a proper prefix, and
    /// not equal to `other`).
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        if self == other {
            return false;
        }
        if self.is_root() {
            return !other.is_root();
        }
        if other.is_root() || self.components.len() >= other.components.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a == b)
    }

    /// All proper prefixes of this path, from the root out to the immediate
    /// parent.
    pub fn get_ancestors(&self) -> Vec<Self> {
        if self.is_root() {
            return Vec::new();
        }
        let mut ancestors = vec![Self::root_with_delimiter(self.delimiter.as_ref())
            .expect("delimiter already validated")];
        for len in 1..self.components.len() {
            ancestors.push(Self {
                components: Arc::new(self.components[..len].to_vec()),
                delimiter: Arc::clone(&self.delimiter),
            });
        }
        ancestors
    }

    /// Returns a new path with every numeric component replaced by
    /// `placeholder`. Used for grouping sibling records under one shape.
    pub fn replace_indices(&self, placeholder: &str) -> Self {
        if self.is_root() {
            return self.clone();
        }
        let components = self
            .components
            .iter()
            .map(|c| {
                if is_numeric(c) {
                    placeholder.to_owned()
                } else {
                    c.clone()
                }
            })
            .collect();
        Self {
            components: Arc::new(components),
            delimiter: Arc::clone(&self.delimiter),
        }
    }

    /// Returns a new path with numeric components stripped out entirely.
    ///
    /// `limit` caps how many numeric components are removed; `None` removes
    /// all of them. `reverse` removes starting from the end of the path
    /// instead of the start.
    pub fn remove_indices(&self, limit: Option<usize>, reverse: bool) -> Self {
        if self.is_root() {
            return self.clone();
        }
        let mut indices: Vec<usize> = self
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| is_numeric(c))
            .map(|(i, _)| i)
            .collect();
        if reverse {
            indices.reverse();
        }
        if let Some(limit) = limit {
            indices.truncate(limit);
        }
        let drop: std::collections::HashSet<usize> = indices.into_iter().collect();
        let components: Vec<String> = self
            .components
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, c)| c.clone())
            .collect();
        if components.is_empty() {
            Self {
                components: Arc::new(vec![String::new()]),
                delimiter: Arc::clone(&self.delimiter),
            }
        } else {
            Self {
                components: Arc::new(components),
                delimiter: Arc::clone(&self.delimiter),
            }
        }
    }

    /// The dotted group key used for flattener collision resolution: the
    /// path with all numeric (record-index / array-index) components
    /// removed, joined with `.`.
    pub fn group_key(&self) -> String {
        self.remove_indices(None, false)
            .components
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The full dotted path, numeric components included.
    pub fn full_path_key(&self) -> String {
        self.components
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The integer value of the first component, used as the record index
    /// when this path addresses a leaf inside a list of records.
    pub fn record_index(&self) -> Result<usize, PathError> {
        let first = self
            .components
            .first()
            .map(String::as_str)
            .unwrap_or_default();
        first
            .parse::<usize>()
            .map_err(|_| PathError::NonNumericRecordIndex {
                component: first.to_owned(),
            })
    }

    /// Stable sort key: depth-first, alphanumeric, with numeric runs
    /// zero-padded to 8 digits so `"9"` sorts before `"10"`.
    pub fn sort_key(&self) -> String {
        self.components
            .iter()
            .map(|c| pad_numeric_runs(c))
            .collect::<Vec<_>>()
            .join("\u{1}")
    }
}

fn is_numeric(component: &str) -> bool {
    !component.is_empty() && component.chars().all(|c| c.is_ascii_digit())
}

fn pad_numeric_runs(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut digits = String::new();
    for ch in component.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                out.push_str(&format!("{:0>8}", digits));
                digits.clear();
            }
            out.push(ch);
        }
    }
    if !digits.is_empty() {
        out.push_str(&format!("{:0>8}", digits));
    }
    out
}

impl PartialEq for ProcessingPath {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components && self.delimiter == other.delimiter
    }
}

impl Eq for ProcessingPath {}

impl std::hash::Hash for ProcessingPath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.components.hash(state);
        self.delimiter.hash(state);
    }
}

impl PartialOrd for ProcessingPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProcessingPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for ProcessingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "{}", self.delimiter);
        }
        write!(f, "{}", self.components.join(&self.delimiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_sentinel() {
        let root = ProcessingPath::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn append_and_parent_roundtrip() {
        let root = ProcessingPath::root();
        let child = root.append("authors").append("0").append("name");
        assert_eq!(child.full_path_key(), "authors.0.name");
        assert_eq!(child.parent().unwrap().full_path_key(), "authors.0");
    }

    #[test]
    fn ancestor_relationship() {
        let a = ProcessingPath::parse("authors.0", ".").unwrap();
        let b = ProcessingPath::parse("authors.0.name", ".").unwrap();
        assert!(a.is_ancestor_of(&b));
        assert!(!b.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&a));
    }

    #[test]
    fn group_key_strips_indices() {
        let p = ProcessingPath::parse("authors.0.name", ".").unwrap();
        assert_eq!(p.group_key(), "authors.name");
    }

    #[test]
    fn record_index_requires_numeric_first_component() {
        let p = ProcessingPath::parse("authors.0.name", ".").unwrap();
        assert_eq!(p.record_index().unwrap(), 0);
        // Reparent so the first component is not the record index.
        let bad = ProcessingPath::parse("authors.name", ".").unwrap();
        assert!(bad.record_index().is_err());
    }

    #[test]
    fn sort_key_orders_numeric_runs_correctly() {
        let a = ProcessingPath::parse("item.9", ".").unwrap();
        let b = ProcessingPath::parse("item.10", ".").unwrap();
        assert!(a.sort_key() < b.sort_key());
    }

    #[test]
    fn delimiter_rejects_embedded_reserved_chars() {
        assert!(ProcessingPath::parse("a/b", "::").is_err());
        assert!(ProcessingPath::parse("a.b", ".").is_ok());
        assert!(ProcessingPath::parse("a:b", ":").is_ok());
    }

    #[test]
    fn delimiter_rejects_whitespace() {
        assert!(ProcessingPath::parse("a b", " ").is_err());
    }
}
