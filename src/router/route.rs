//! Hash routes.
//!
//! Grammar: `#/segment(/segment)*`. The first segment names a page; the rest
//! are parameters. An odd number of parameter segments starts with one
//! unkeyed value (stored under the empty key), the remainder are consumed
//! pairwise as `key/value`.
//!
//! ```text
//! #/category/dvir         → category { "": "dvir" }
//! #/category/name/dvir    → category { "name": "dvir" }
//! #/category/dvir/sort/asc → category { "": "dvir", "sort": "asc" }
//! ```
//!
//! Page keys serialize the same way, so `Route::parse(key)` gives back the
//! parameters a key was built from.

use serde_json::Value;

use crate::types::Attrs;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    /// Page name. Empty for the bare `#/` route.
    pub name: String,
    pub params: Attrs,
}

impl Route {
    /// Parse a hash fragment. A leading `#` is optional.
    pub fn parse(hash: &str) -> Self {
        let path = hash.strip_prefix('#').unwrap_or(hash);
        let mut segments: Vec<&str> = path.split('/').collect();
        if segments.first() == Some(&"") {
            segments.remove(0);
        }
        if segments.last() == Some(&"") {
            segments.pop();
        }

        let Some((name, params)) = segments.split_first() else {
            return Self::default();
        };
        Self {
            name: (*name).to_string(),
            params: decode_params(params),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Key of the page materialized for this name and parameter set.
    pub fn key(&self) -> String {
        page_key(&self.name, &self.params)
    }

    /// The parameters as one data row.
    pub fn params_row(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

/// Decode parameter segments.
pub fn decode_params(segments: &[&str]) -> Attrs {
    let mut params = Attrs::new();
    let mut rest = segments;
    if rest.len() % 2 == 1 {
        params.insert(String::new(), Value::String(rest[0].to_string()));
        rest = &rest[1..];
    }
    for pair in rest.chunks_exact(2) {
        params.insert(pair[0].to_string(), Value::String(pair[1].to_string()));
    }
    params
}

/// `name` followed by the parameters in key order: the unkeyed value bare,
/// keyed values as `key/value`.
pub fn page_key(name: &str, params: &Attrs) -> String {
    let mut key = name.to_string();
    for (k, v) in params {
        let value = match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !k.is_empty() {
            key.push('/');
            key.push_str(k);
        }
        key.push('/');
        key.push_str(&value);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unkeyed_value() {
        let route = Route::parse("#/category/dvir");
        assert_eq!(route.name, "category");
        assert_eq!(route.params_row(), json!({ "": "dvir" }));
        assert_eq!(route.key(), "category/dvir");
    }

    #[test]
    fn test_keyed_value() {
        let route = Route::parse("#/category/name/dvir");
        assert_eq!(route.params_row(), json!({ "name": "dvir" }));
        assert_eq!(route.key(), "category/name/dvir");
    }

    #[test]
    fn test_odd_length_mixed() {
        let route = Route::parse("#/category/dvir/sort/asc/");
        assert_eq!(route.params_row(), json!({ "": "dvir", "sort": "asc" }));
        assert_eq!(Route::parse(&route.key()), route);
    }

    #[test]
    fn test_empty_hash() {
        assert_eq!(Route::parse(""), Route::default());
        assert_eq!(Route::parse("#/"), Route::default());
        assert_eq!(Route::parse("#/main").name, "main");
        assert_eq!(Route::parse("about").name, "about");
    }
}
