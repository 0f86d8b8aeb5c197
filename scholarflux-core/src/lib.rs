//! Path discovery, flattening, extraction, and normalization primitives
//! shared by every provider and coordinator in scholar-flux.
//!
//! The pipeline a raw provider response moves through:
//!
//! 1. [`extractor::DataExtractor`] splits a response body into a record list
//!    and sibling metadata.
//! 2. [`discover::PathDiscoverer`] walks a record depth-first into
//!    [`node::PathNode`]s.
//! 3. One of the [`processor::RecordProcessor`] strategies turns those nodes
//!    into a flat field map, using [`flatten::RecursiveJsonProcessor`]'s
//!    collision resolution where recursion is involved.
//! 4. [`normalize::Normalizer`] maps the provider-specific flat field map
//!    onto the canonical schema via a [`normalize::FieldMap`].

pub mod discover;
pub mod error;
pub mod extractor;
pub mod flatten;
pub mod node;
pub mod node_map;
pub mod normalize;
pub mod path;
pub mod processor;

pub use discover::{DiscoveryConfig, PathDiscoverer};
pub use error::{NormalizationError, PathError, ProcessingError};
pub use extractor::{DataExtractor, ExtractedData, ExtractionMode};
pub use flatten::{FieldValue, FlattenConfig, RecursiveJsonProcessor};
pub use node::{LeafValue, PathNode};
pub use node_map::{PathNodeMap, RecordPathChainMap, RecordPathNodeMap};
pub use normalize::{FieldMap, Normalizer};
pub use path::ProcessingPath;
pub use processor::{ExplicitFieldProcessor, KeyFilter, PathDataProcessor, RecordKeys, RecordProcessor, RecursiveDataProcessor};
