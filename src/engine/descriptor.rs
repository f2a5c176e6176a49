//! Object descriptors - the plain-data description of a node.
//!
//! Applications hand the engine descriptors (usually parsed from JSON); the
//! widget catalog turns them into nodes.
//!
//! ```json
//! {
//!   "type": "template",
//!   "id": "fruits",
//!   "template": {
//!     "row": { "type": "container", "style": { "variant": "surface" } },
//!     "objects": [ { "type": "label", "behavior": { "text": "{{name}}" } } ]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Attrs, NodeId};

/// Declarative description of one node and its nested children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    /// Widget type tag resolved through the catalog.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Developer-chosen identity. Generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Element tag override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Extra raw element attributes.
    pub attributes: Attrs,
    /// Presentation intents.
    pub style: Attrs,
    /// Data-only behaviors (text templates, flags).
    pub behavior: Attrs,
    /// Structural payload.
    pub data: Attrs,
    /// Nested child descriptors, in render order.
    pub children: Vec<Descriptor>,
    /// Makes the node a template host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Box<TemplateSpec>>,
    /// Page metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageSpec>,
}

/// Template declaration of a host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSpec {
    /// Descriptor of the container created once per data row.
    pub row: Descriptor,
    /// Abstract sub-objects duplicated into every row container.
    pub objects: Vec<Descriptor>,
    /// Remote data source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
}

/// Remote endpoint a template host loads its rows from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub url: String,
    #[serde(default)]
    pub query: Value,
}

/// Page declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Descriptor {
    /// Descriptor of the given type with everything else defaulted.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_style(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.style.insert(key.to_string(), value.into());
        self
    }

    pub fn with_behavior(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.behavior.insert(key.to_string(), value.into());
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: Descriptor) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_template(mut self, template: TemplateSpec) -> Self {
        self.template = Some(Box::new(template));
        self
    }

    pub fn with_page(mut self, name: impl Into<String>, title: Option<&str>) -> Self {
        self.page = Some(PageSpec {
            name: name.into(),
            title: title.map(str::to_string),
        });
        self
    }

    /// Parse a descriptor from a JSON value.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
