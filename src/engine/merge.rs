//! Attribute merging.
//!
//! Node construction merges three layers of attributes with a fixed
//! precedence: caller > type default > engine default. Nested objects merge
//! key by key; every other value is replaced wholesale by the higher layer.

use serde_json::Value;

use crate::types::Attrs;

/// Deep-merge `top` into `base`. Keys in `top` win.
pub fn overlay(base: &mut Attrs, top: &Attrs) {
    for (key, value) in top {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => overlay(existing, incoming),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge the three construction layers.
pub fn merge_layers(engine_default: &Attrs, type_default: &Attrs, caller: &Attrs) -> Attrs {
    let mut merged = engine_default.clone();
    overlay(&mut merged, type_default);
    overlay(&mut merged, caller);
    merged
}

/// Convert a JSON value into an attribute map. Non-objects yield `None`.
pub fn as_attrs(value: &Value) -> Option<&Attrs> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attrs {
        as_attrs(&value).cloned().unwrap()
    }

    #[test]
    fn test_precedence() {
        let merged = merge_layers(
            &attrs(json!({ "display": "block", "size": "m" })),
            &attrs(json!({ "display": "inline", "variant": "primary" })),
            &attrs(json!({ "variant": "error" })),
        );
        assert_eq!(merged["display"], "inline");
        assert_eq!(merged["size"], "m");
        assert_eq!(merged["variant"], "error");
    }

    #[test]
    fn test_nested_objects_merge_per_key() {
        let mut base = attrs(json!({ "meta": { "a": 1, "b": 2 } }));
        overlay(&mut base, &attrs(json!({ "meta": { "b": 3, "c": 4 } })));
        assert_eq!(base["meta"], json!({ "a": 1, "b": 3, "c": 4 }));
    }

    #[test]
    fn test_non_object_replaces_object() {
        let mut base = attrs(json!({ "meta": { "a": 1 } }));
        overlay(&mut base, &attrs(json!({ "meta": "flat" })));
        assert_eq!(base["meta"], "flat");
    }
}
