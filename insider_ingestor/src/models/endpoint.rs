//! Value objects describing one provider call.

use indexmap::IndexMap;

/// How a decoded JSON body becomes rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// A JSON array of objects, one row per object.
    Records,
    /// A single JSON object that becomes exactly one row.
    Record,
    /// An object of `date -> fields` nested under `key`.
    Series { key: String },
    /// An array of report objects nested under `key`.
    Reports { key: String },
}

/// Immutable description of a provider call.
///
/// Credentials may appear in `headers` or `params`; they never take part in
/// the cache identity, which is built from `provider`, `path_suffix`,
/// `cache_scope` and the varying value only.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    pub provider: String,
    pub base_url: String,
    pub path_suffix: String,
    pub headers: IndexMap<String, String>,
    pub params: IndexMap<String, String>,
    pub shape: ResponseShape,
    pub cache_scope: Option<String>,
}

impl EndpointDescriptor {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        path_suffix: impl Into<String>,
        shape: ResponseShape,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            path_suffix: path_suffix.into(),
            headers: IndexMap::new(),
            params: IndexMap::new(),
            shape,
            cache_scope: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.cache_scope = Some(scope.into());
        self
    }

    /// Returns a copy with one query parameter set to `value`.
    pub fn with_param(&self, name: &str, value: &str) -> Self {
        let mut specialized = self.clone();
        specialized.params.insert(name.to_string(), value.to_string());
        specialized
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Joins base address and path suffix with exactly one slash.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let suffix = self.path_suffix.trim_start_matches('/');
        if suffix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{suffix}")
        }
    }
}

/// A descriptor whose `vary` parameter is filled in per value of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    pub descriptor: EndpointDescriptor,
    pub vary: String,
}

impl RequestTemplate {
    pub fn new(descriptor: EndpointDescriptor, vary: impl Into<String>) -> Self {
        Self {
            descriptor,
            vary: vary.into(),
        }
    }

    pub fn specialize(&self, value: &str) -> EndpointDescriptor {
        self.descriptor.with_param(&self.vary, value)
    }
}
