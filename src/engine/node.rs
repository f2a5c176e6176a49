//! Node - the atomic element of the object tree.
//!
//! A node is a shared base record (identity, style intents, behaviors,
//! structural data, children, lifecycle flags) plus optional variant
//! extensions: page metadata and a template binding. Widget types differ
//! only in the defaults they construct these fields with.
//!
//! Invariants held here:
//! - the identity never changes after construction
//! - the children list never contains the same identity twice

use serde_json::Value;

use super::behavior::{Behavior, BehaviorMap};
use crate::template::TemplateBinding;
use crate::types::{Attrs, Lifecycle, NodeId};

// =============================================================================
// Page Metadata
// =============================================================================

/// Page extension of a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageMeta {
    /// Name the page is registered under.
    pub name: String,
    /// Title restored when the page is shown.
    pub title: Option<String>,
    /// Route parameters this page was materialized for.
    pub params: Attrs,
    /// Template page this page was duplicated from.
    pub origin: Option<NodeId>,
}

// =============================================================================
// Node
// =============================================================================

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Widget type tag the node was constructed from.
    pub kind: String,
    /// Element tag.
    pub tag: String,
    /// Extra raw element attributes.
    pub attributes: Attrs,
    /// Presentation intents, resolved into classes by the style resolver.
    pub style: Attrs,
    pub behavior: BehaviorMap,
    pub data: Attrs,
    children: Vec<NodeId>,
    /// Owning container. `None` means unattached or root.
    pub parent: Option<NodeId>,
    pub flags: Lifecycle,
    /// Classes resolved in the latest build.
    pub current_classes: Option<String>,
    /// Classes the render target holds since the previous build.
    pub previous_classes: Option<String>,
    /// Behavior map as of the last build that changed it.
    pub behavior_snapshot: Option<BehaviorMap>,
    pub page: Option<PageMeta>,
    pub template: Option<TemplateBinding>,
}

impl Node {
    /// Bare node with no attributes.
    pub fn new(id: impl Into<NodeId>, kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            tag: tag.into(),
            attributes: Attrs::new(),
            style: Attrs::new(),
            behavior: BehaviorMap::new(),
            data: Attrs::new(),
            children: Vec::new(),
            parent: None,
            flags: Lifecycle::NONE,
            current_classes: None,
            previous_classes: None,
            behavior_snapshot: None,
            page: None,
            template: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy of this node under a new identity.
    pub fn clone_as(&self, id: impl Into<NodeId>) -> Self {
        self.clone().into_identity(id)
    }

    pub(crate) fn into_identity(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    // -------------------------------------------------------------------------
    // Children
    // -------------------------------------------------------------------------

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_child(&self, id: &str) -> bool {
        self.children.iter().any(|c| c == id)
    }

    /// Append a child identity. Returns false if it was already present.
    pub fn push_child(&mut self, id: impl Into<NodeId>) -> bool {
        let id = id.into();
        if self.has_child(&id) {
            return false;
        }
        self.children.push(id);
        true
    }

    /// Drop a child identity from the list. Returns false if absent.
    pub fn remove_child_entry(&mut self, id: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c != id);
        self.children.len() != before
    }

    pub(crate) fn take_children(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.children)
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    pub fn is_materialized(&self) -> bool {
        self.flags.contains(Lifecycle::MATERIALIZED)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(Lifecycle::ABSTRACT)
    }

    /// Template pages and the pages duplicated from them.
    pub fn is_template_backed(&self) -> bool {
        self.page.is_some()
            && (self.template.is_some()
                || self.page.as_ref().is_some_and(|p| p.origin.is_some()))
    }

    pub fn style_str(&self, key: &str) -> Option<&str> {
        self.style.get(key).and_then(Value::as_str)
    }

    pub fn set_style(&mut self, key: &str, value: impl Into<Value>) {
        self.style.insert(key.to_string(), value.into());
    }

    pub fn text(&self) -> Option<&str> {
        self.behavior.get("text").and_then(Behavior::as_text)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.behavior.get(key).and_then(Behavior::as_flag).unwrap_or(false)
    }

    /// Forget everything the previous builds recorded.
    pub fn clear_snapshots(&mut self) {
        self.current_classes = None;
        self.previous_classes = None;
        self.behavior_snapshot = None;
    }
}
