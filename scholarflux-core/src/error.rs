//! Error taxonomy for path handling, flattening, extraction, and normalization.

use thiserror::Error;

/// Errors raised while constructing or manipulating a [`crate::path::ProcessingPath`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The delimiter was empty, whitespace-only, or contained a disallowed
    /// combination of reserved characters.
    #[error("invalid path delimiter {delimiter:?}: {reason}")]
    InvalidDelimiter { delimiter: String, reason: String },

    /// A non-root component was empty or whitespace-only.
    #[error("path component at index {index} is empty")]
    EmptyComponent { index: usize },

    /// `record_index` was requested on a path whose first component is not
    /// an unsigned integer.
    #[error("path component {component:?} is not a valid record index")]
    NonNumericRecordIndex { component: String },

    /// A path was inserted into a record-scoped map whose declared index
    /// does not match the path's first component.
    #[error("path record index {found} does not match declared record index {expected}")]
    RecordIndexMismatch { expected: usize, found: usize },

    /// Insertion failed because a descendant of the path already exists in
    /// the map (the terminal invariant forbids ancestor/descendant overlap).
    #[error("cannot insert {path}: a descendant path is already present")]
    DescendantExists { path: String },
}

/// Errors raised while discovering or flattening a document.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcessingError {
    #[error(transparent)]
    Path(#[from] PathError),

    /// A JSON value could not be represented as a [`crate::node::LeafValue`].
    #[error("value at {path} is not representable as a leaf")]
    NotALeaf { path: String },
}

/// Errors raised while normalizing flattened records to the canonical schema.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("field {field} declared in field map has no source key in the record")]
    MissingField { field: String },

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
