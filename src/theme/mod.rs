//! Theme - turns style intents into class names.
//!
//! Nodes never carry raw classes. They carry an intent map (`variant`,
//! `display`, `layer`, ...) and the build pipeline asks a [`StyleResolver`]
//! for the class string. Resolution must be deterministic for a given intent
//! map and theme, since the pipeline skips writes when the string is
//! unchanged.
//!
//! # Class Rules of [`VariantResolver`]
//!
//! ```text
//! theme "dark"           → theme-dark        (always first)
//! variant: "primary"     → v-primary
//! display: "none"        → is-hidden
//! display: "inline"      → is-inline
//! display: "block"       → is-block
//! layer: "lowered"       → layer-lowered
//! classes: "a b"         → a b               (verbatim)
//! size: "m"              → size-m
//! round: true            → round
//! ```
//!
//! Intents are visited in key order, so equal maps give equal strings.

mod variant;

pub use variant::Variant;

use serde_json::Value;
use tracing::trace;

use crate::engine::Node;

/// Style-resolution collaborator.
pub trait StyleResolver {
    fn resolve_classes(&self, node: &Node) -> String;
}

/// Bundled resolver implementing the class rules above.
#[derive(Debug, Clone, Default)]
pub struct VariantResolver {
    theme: Option<String>,
}

impl VariantResolver {
    pub fn new(theme: Option<String>) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }
}

impl StyleResolver for VariantResolver {
    fn resolve_classes(&self, node: &Node) -> String {
        let mut classes: Vec<String> = Vec::new();
        if let Some(theme) = &self.theme {
            classes.push(format!("theme-{theme}"));
        }

        for (key, value) in &node.style {
            match (key.as_str(), value) {
                ("variant", Value::String(name)) => match Variant::parse(name) {
                    Some(variant) => classes.push(variant.class_name()),
                    None => trace!(id = node.id(), variant = %name, "unknown variant"),
                },
                ("display", Value::String(mode)) => classes.push(match mode.as_str() {
                    "none" => "is-hidden".to_string(),
                    "inline" => "is-inline".to_string(),
                    "block" => "is-block".to_string(),
                    other => format!("display-{other}"),
                }),
                ("classes", Value::String(raw)) => {
                    classes.extend(raw.split_whitespace().map(str::to_string));
                }
                (_, Value::Bool(true)) => classes.push(key.clone()),
                (_, Value::String(v)) if !v.is_empty() => classes.push(format!("{key}-{v}")),
                (_, Value::Number(n)) => classes.push(format!("{key}-{n}")),
                _ => {}
            }
        }
        classes.join(" ")
    }
}
