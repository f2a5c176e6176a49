//! Markup synthesis helpers.
//!
//! All text and attribute values go through [`escape`], so a `<`, `>` or `"`
//! in generated markup always belongs to a tag.

use serde_json::Value;

use super::string_builder::StringBuilder;
use crate::types::Attrs;

/// Tags that never take a closing tag or children.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// HTML-escape text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `{{field}}` placeholders from `data`. Unknown fields render empty.
pub fn render_text(template: &str, data: &Attrs) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let field = after[..end].trim();
        if let Some(value) = data.get(field) {
            out.push_str(&value_text(value));
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Opening tag with identity, classes and extra raw attributes.
pub fn open_tag(sb: &mut StringBuilder, tag: &str, id: &str, classes: &str, attributes: &Attrs) {
    sb.push(format!("<{tag} id=\"{}\"", escape(id)));
    if !classes.is_empty() {
        sb.push(format!(" class=\"{}\"", escape(classes)));
    }
    for (name, value) in attributes {
        if name == "id" || name == "class" {
            continue;
        }
        match value {
            Value::Bool(true) => sb.push(format!(" {name}")),
            Value::Bool(false) | Value::Null => {}
            other => sb.push(format!(" {name}=\"{}\"", escape(&value_text(other)))),
        }
    }
    sb.push(">");
}

pub fn close_tag(sb: &mut StringBuilder, tag: &str) {
    sb.push(format!("</{tag}>"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_text() {
        let data = json!({ "name": "Dvir", "count": 3 }).as_object().cloned().unwrap();
        assert_eq!(render_text("Hi {{name}} ({{ count }})", &data), "Hi Dvir (3)");
        assert_eq!(render_text("{{missing}}!", &data), "!");
        assert_eq!(render_text("open {{name", &data), "open {{name");
    }

    #[test]
    fn test_open_tag() {
        let mut sb = StringBuilder::new();
        let attrs = json!({ "href": "/a?b=\"c\"", "disabled": true, "hidden": false })
            .as_object()
            .cloned()
            .unwrap();
        open_tag(&mut sb, "a", "link", "v-primary", &attrs);
        assert_eq!(
            sb.join(""),
            r#"<a id="link" class="v-primary" disabled href="/a?b=&quot;c&quot;">"#
        );
    }

    #[test]
    fn test_void_tags() {
        assert!(is_void("img"));
        assert!(!is_void("div"));
    }
}
