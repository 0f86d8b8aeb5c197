//! Maps a provider's flattened, provider-specific field names onto the
//! canonical schema the rest of the pipeline operates on.

use crate::error::NormalizationError;
use crate::flatten::FieldValue;

/// Declares, for each canonical field name, which flattened source key(s) a
/// provider's response uses.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    /// Canonical name -> ordered list of candidate source keys, tried in
    /// order until one is present.
    entries: indexmap::IndexMap<String, Vec<String>>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, canonical: impl Into<String>, source_keys: Vec<String>) -> Self {
        self.entries.insert(canonical.into(), source_keys);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Applies a [`FieldMap`] to a flattened record, producing the canonical
/// field map consumed by downstream `SearchResult` construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub field_map: FieldMap,
    /// When true, a declared canonical field with no matching source key is
    /// a hard error. When false, it is simply omitted from the output.
    pub raise_on_error: bool,
}

impl Normalizer {
    pub fn new(field_map: FieldMap, raise_on_error: bool) -> Self {
        Self {
            field_map,
            raise_on_error,
        }
    }

    pub fn normalize(
        &self,
        record: &indexmap::IndexMap<String, FieldValue>,
    ) -> Result<indexmap::IndexMap<String, FieldValue>, NormalizationError> {
        let mut out = indexmap::IndexMap::new();
        for (canonical, source_keys) in self.field_map.fields() {
            let found = source_keys.iter().find_map(|key| record.get(key));
            match found {
                Some(value) => {
                    out.insert(canonical.to_owned(), value.clone());
                }
                None if self.raise_on_error => {
                    return Err(NormalizationError::MissingField {
                        field: canonical.to_owned(),
                    });
                }
                None => {}
            }
        }
        Ok(out)
    }
}
