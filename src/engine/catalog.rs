//! Widget catalog - static registration table from type tag to constructor.
//!
//! Every widget type is a flat variant: a constructor that builds the shared
//! node record from its own defaults. There is no inheritance chain; a
//! variant that wants another's defaults calls [`construct_with`] with them.
//!
//! Tags are validated when they are registered, so an unknown tag is rejected
//! at the boundary with [`EngineError::UnknownType`].
//!
//! # Example
//!
//! ```ignore
//! fn badge(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
//!     construct_with(&VariantDefaults::new("badge").tag("span").style("variant", "accent"), id, d, config)
//! }
//!
//! let mut catalog = WidgetCatalog::with_builtins();
//! catalog.register("badge", badge)?;
//! ```

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use super::behavior::behaviors_from_attrs;
use super::descriptor::Descriptor;
use super::merge::merge_layers;
use super::node::{Node, PageMeta};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::template::{Attach, TemplateBinding};
use crate::types::{Attrs, NodeId};

/// Constructor of one widget variant.
pub type Constructor = fn(NodeId, &Descriptor, &EngineConfig) -> Node;

// =============================================================================
// Variant Defaults
// =============================================================================

/// Per-type defaults. Sits between the engine defaults and the caller's
/// descriptor in the merge order.
#[derive(Debug, Clone, Default)]
pub struct VariantDefaults {
    pub kind: &'static str,
    pub tag: Option<&'static str>,
    pub style: Attrs,
    pub behavior: Attrs,
    pub data: Attrs,
}

impl VariantDefaults {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn style(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.style.insert(key.to_string(), value.into());
        self
    }

    pub fn behavior(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.behavior.insert(key.to_string(), value.into());
        self
    }
}

/// Build a node from variant defaults and a caller descriptor.
pub fn construct_with(
    defaults: &VariantDefaults,
    id: NodeId,
    descriptor: &Descriptor,
    config: &EngineConfig,
) -> Node {
    let tag = descriptor
        .tag
        .clone()
        .or_else(|| defaults.tag.map(str::to_string))
        .unwrap_or_else(|| config.default_tag.clone());
    let kind = descriptor.kind.as_deref().unwrap_or(defaults.kind);

    let mut node = Node::new(id, kind, tag);
    node.attributes = descriptor.attributes.clone();
    node.style = merge_layers(&config.style_defaults, &defaults.style, &descriptor.style);
    node.behavior = behaviors_from_attrs(&merge_layers(
        &config.behavior_defaults,
        &defaults.behavior,
        &descriptor.behavior,
    ));
    node.data = merge_layers(&config.data_defaults, &defaults.data, &descriptor.data);

    if let Some(spec) = &descriptor.page {
        node.page = Some(PageMeta {
            name: spec.name.clone(),
            title: spec.title.clone(),
            ..Default::default()
        });
    }
    if let Some(spec) = &descriptor.template {
        node.template = Some(TemplateBinding::from_spec(spec, Attach::Host));
    }
    node
}

// =============================================================================
// Built-in Variants
// =============================================================================

fn block(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("block"), id, d, config)
}

fn container(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("container").style("display", "block"), id, d, config)
}

fn app(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("app").style("layout", "app"), id, d, config)
}

fn view(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("view").tag("main").style("layout", "view"), id, d, config)
}

fn button(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    let defaults = VariantDefaults::new("button")
        .tag("button")
        .style("variant", "primary")
        .behavior("animate_enter", false);
    construct_with(&defaults, id, d, config)
}

fn label(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("label").tag("span"), id, d, config)
}

fn image(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("image").tag("img"), id, d, config)
}

fn input(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    construct_with(&VariantDefaults::new("input").tag("input"), id, d, config)
}

fn loading(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    let defaults = VariantDefaults::new("loading").style("display", "none").style("variant", "muted");
    construct_with(&defaults, id, d, config)
}

fn template(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    let mut node = construct_with(&VariantDefaults::new("template"), id, d, config);
    if node.template.is_none() {
        node.template = Some(TemplateBinding::default());
    }
    node
}

/// Pages start hidden; the pager shows them. A page with a template section
/// is template-backed: its duplicates are pages attached next to it.
fn page(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
    let defaults = VariantDefaults::new("page").tag("section").style("display", "none");
    let mut node = construct_with(&defaults, id, d, config);

    if node.page.is_none() {
        let name = node
            .data
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(|| node.id().to_string(), str::to_string);
        let title = node.data.get("title").and_then(Value::as_str).map(str::to_string);
        node.page = Some(PageMeta {
            name,
            title,
            ..Default::default()
        });
    }

    if let Some(spec) = &d.template {
        let mut binding = TemplateBinding::from_spec(spec, Attach::HostParent);
        if binding.row.kind.is_none() {
            binding.row.kind = Some("page".to_string());
        }
        node.template = Some(binding);
    }
    node
}

// =============================================================================
// Catalog
// =============================================================================

/// Type tag → constructor table.
#[derive(Clone, Default)]
pub struct WidgetCatalog {
    constructors: HashMap<String, Constructor>,
}

impl fmt::Debug for WidgetCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.constructors.keys().collect();
        tags.sort();
        f.debug_struct("WidgetCatalog").field("tags", &tags).finish()
    }
}

impl WidgetCatalog {
    /// Catalog with no types registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with the built-in variants.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        let builtins: [(&str, Constructor); 11] = [
            ("block", block),
            ("container", container),
            ("app", app),
            ("view", view),
            ("button", button),
            ("label", label),
            ("image", image),
            ("input", input),
            ("loading", loading),
            ("template", template),
            ("page", page),
        ];
        for (tag, ctor) in builtins {
            catalog.constructors.insert(tag.to_string(), ctor);
        }
        catalog
    }

    /// Register a constructor. Tags must be valid and not taken.
    pub fn register(&mut self, tag: &str, constructor: Constructor) -> Result<()> {
        if !is_valid_tag(tag) {
            return Err(EngineError::InvalidTypeTag(tag.to_string()));
        }
        if self.constructors.contains_key(tag) {
            return Err(EngineError::TypeAlreadyRegistered(tag.to_string()));
        }
        self.constructors.insert(tag.to_string(), constructor);
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Construct a node of the given type.
    pub fn construct(
        &self,
        tag: &str,
        id: NodeId,
        descriptor: &Descriptor,
        config: &EngineConfig,
    ) -> Result<Node> {
        let constructor = self
            .constructors
            .get(tag)
            .ok_or_else(|| EngineError::UnknownType(tag.to_string()))?;
        Ok(constructor(id, descriptor, config))
    }
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
