//! Maps the universal search parameters (query, pagination, API key) onto a
//! specific provider's query-string parameter names.

use std::collections::HashMap;

/// Per-provider translation of universal search parameters to the
/// provider-specific query-string keys the HTTP request actually sends.
#[derive(Debug, Clone)]
pub struct APIParameterMap {
    pub query: String,
    pub records_per_page: String,
    pub start: Option<String>,
    pub api_key_parameter: Option<String>,
    pub api_key_required: bool,
    /// When true, `start`'s value is `(page - 1) * records_per_page`
    /// (an offset); when false, the raw page number is passed through.
    pub auto_calculate_page: bool,
    /// Extra universal-name -> provider-specific-name mappings beyond the
    /// core fields above (e.g. Crossref's `mailto`).
    pub additional_parameters: HashMap<String, String>,
}

impl APIParameterMap {
    pub fn new(query: impl Into<String>, records_per_page: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            records_per_page: records_per_page.into(),
            start: None,
            api_key_parameter: None,
            api_key_required: false,
            auto_calculate_page: true,
            additional_parameters: HashMap::new(),
        }
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_api_key(mut self, parameter: impl Into<String>, required: bool) -> Self {
        self.api_key_parameter = Some(parameter.into());
        self.api_key_required = required;
        self
    }

    pub fn without_auto_calculate_page(mut self) -> Self {
        self.auto_calculate_page = false;
        self
    }

    pub fn with_additional_parameter(mut self, universal_name: impl Into<String>, provider_name: impl Into<String>) -> Self {
        self.additional_parameters.insert(universal_name.into(), provider_name.into());
        self
    }

    /// Builds the provider-specific query-string parameter map for one
    /// request page.
    pub fn build(
        &self,
        query: &str,
        page: u32,
        records_per_page: u32,
        api_key: Option<&str>,
        extra: &HashMap<String, String>,
    ) -> indexmap::IndexMap<String, String> {
        let mut params = indexmap::IndexMap::new();
        params.insert(self.query.clone(), query.to_owned());
        params.insert(self.records_per_page.clone(), records_per_page.to_string());

        if let Some(start_param) = &self.start {
            let start_value = if self.auto_calculate_page {
                ((page.saturating_sub(1)) as u64 * records_per_page as u64).to_string()
            } else {
                page.to_string()
            };
            params.insert(start_param.clone(), start_value);
        }

        if let Some(key_param) = &self.api_key_parameter {
            if let Some(key) = api_key {
                params.insert(key_param.clone(), key.to_owned());
            }
        }

        for (universal_name, provider_name) in &self.additional_parameters {
            if let Some(value) = extra.get(universal_name) {
                params.insert(provider_name.clone(), value.clone());
            }
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_calculate_page_produces_offset() {
        let map = APIParameterMap::new("q", "rows").with_start("start");
        let params = map.build("rust", 3, 50, None, &HashMap::new());
        assert_eq!(params.get("start"), Some(&"100".to_owned()));
    }

    #[test]
    fn disabled_auto_calculate_passes_raw_page() {
        let map = APIParameterMap::new("q", "rows").with_start("page").without_auto_calculate_page();
        let params = map.build("rust", 3, 50, None, &HashMap::new());
        assert_eq!(params.get("page"), Some(&"3".to_owned()));
    }

    #[test]
    fn api_key_omitted_when_not_supplied() {
        let map = APIParameterMap::new("q", "rows").with_api_key("api_key", true);
        let params = map.build("rust", 1, 25, None, &HashMap::new());
        assert!(!params.contains_key("api_key"));
    }

    #[test]
    fn additional_parameters_pass_through_when_present() {
        let map = APIParameterMap::new("query", "rows").with_additional_parameter("mailto", "mailto");
        let mut extra = HashMap::new();
        extra.insert("mailto".to_owned(), "team@example.com".to_owned());
        let params = map.build("rust", 1, 25, None, &extra);
        assert_eq!(params.get("mailto"), Some(&"team@example.com".to_owned()));
    }
}
