//! Deterministic file-system identity of a logical request.

use std::fmt;

use crate::models::endpoint::EndpointDescriptor;

/// A cache key of the form `{provider}_{suffix}[+{scope}][_{value}]`.
///
/// The path suffix has its segments joined by `-`. Inside every component,
/// bytes outside `[A-Za-z0-9.-]` are percent-encoded (so `_`, `+` and `%`
/// only ever appear as separators or escapes), and a `-` inside a suffix
/// segment is encoded too. Distinct component tuples therefore never share
/// a key, in this process or in any later one reading the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    origin: String,
}

impl CacheKey {
    pub fn resolve(provider: &str, path_suffix: &str, value: Option<&str>) -> Self {
        Self::scoped(provider, path_suffix, None, value)
    }

    pub fn scoped(
        provider: &str,
        path_suffix: &str,
        scope: Option<&str>,
        value: Option<&str>,
    ) -> Self {
        let suffix = path_suffix.trim_matches('/');
        let segments: Vec<String> = suffix.split('/').map(|s| encode(s, b"-")).collect();
        let mut key = format!("{}_{}", encode(provider, b""), segments.join("-"));
        if let Some(scope) = scope {
            key.push('+');
            key.push_str(&encode(scope, b""));
        }
        if let Some(value) = value {
            key.push('_');
            key.push_str(&encode(value, b""));
        }
        // NUL marks an absent component.
        let origin = [
            provider,
            suffix,
            scope.unwrap_or("\u{0}"),
            value.unwrap_or("\u{0}"),
        ]
        .join("\u{1f}");
        Self { key, origin }
    }

    /// Derives the key for `descriptor`, specialized with `value`.
    ///
    /// Headers and query parameters never take part, so credentials do not
    /// leak into file names.
    pub fn for_descriptor(descriptor: &EndpointDescriptor, value: Option<&str>) -> Self {
        Self::scoped(
            &descriptor.provider,
            &descriptor.path_suffix,
            descriptor.cache_scope.as_deref(),
            value,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The inputs the key was built from, with the suffix trimmed of outer
    /// slashes.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The name the key occupies on a case-insensitive file system.
    pub fn folded(&self) -> String {
        self.key.to_ascii_lowercase()
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn encode(raw: &str, escape: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            _ if escape.contains(&byte) => out.push_str(&format!("%{byte:02X}")),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
