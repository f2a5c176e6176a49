//! Engine configuration.
//!
//! Every field has a default, so a configuration document only needs to name
//! what it changes.
//!
//! # Example
//!
//! ```ignore
//! use trellis::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "id_prefix": "n", "template_timeout_ms": 2000 }"#)?;
//! assert_eq!(config.default_tag, "div");
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::types::{Attrs, NodeId};

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tag used when neither the caller nor the widget type names one.
    pub default_tag: String,
    /// Prefix of generated identities.
    pub id_prefix: String,
    /// Type tag of the application root container.
    pub root_type: String,
    /// Type tag of the main view.
    pub main_view_type: String,
    /// Element shown while the history counter is non-zero.
    pub back_indicator: NodeId,
    /// Element shown while a remote template load is in flight.
    pub loading_indicator: NodeId,
    /// How long a route may wait for template data before it fails.
    pub template_timeout_ms: u64,
    /// Animate the very first page instead of showing it immediately.
    pub animate_first_page: bool,
    /// Ambient theme class handed to the style resolver.
    pub theme: Option<String>,
    /// Engine-wide style intents, overridden by type defaults and callers.
    pub style_defaults: Attrs,
    /// Engine-wide behavior entries. Only data-valued behaviors (text,
    /// attributes) can come from a document.
    pub behavior_defaults: Attrs,
    pub data_defaults: Attrs,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_tag: "div".to_string(),
            id_prefix: "o".to_string(),
            root_type: "app".to_string(),
            main_view_type: "view".to_string(),
            back_indicator: "back".to_string(),
            loading_indicator: "loading".to_string(),
            template_timeout_ms: 10_000,
            animate_first_page: false,
            theme: None,
            style_defaults: Attrs::new(),
            behavior_defaults: Attrs::new(),
            data_defaults: Attrs::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Template wait timeout as a [`Duration`].
    pub fn template_timeout(&self) -> Duration {
        Duration::from_millis(self.template_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "id_prefix": "n", "template_timeout_ms": 250 }"#)
            .unwrap();
        assert_eq!(config.id_prefix, "n");
        assert_eq!(config.template_timeout(), Duration::from_millis(250));
        assert_eq!(config.default_tag, "div");
        assert_eq!(config.back_indicator, "back");
    }

    #[test]
    fn test_engine_defaults_from_document() {
        let config = EngineConfig::from_json(r#"{ "style_defaults": { "size": "m" } }"#).unwrap();
        assert_eq!(config.style_defaults["size"], "m");
        assert!(config.behavior_defaults.is_empty());
        assert!(config.data_defaults.is_empty());
    }

    #[test]
    fn test_rejects_malformed_document() {
        assert!(EngineConfig::from_json("{ not json").is_err());
    }
}
