//! Object Registry - identity → node map with creation and removal lifecycle.
//!
//! Manages the lifecycle of nodes:
//! - identity generation (never reuses a live identity)
//! - creation from descriptors through the widget catalog
//! - deep duplication with override maps
//! - removal from both the render target and the map
//! - the per-pass "prepared" set the build pipeline fills and commit drains
//! - cached identities of the root container and the main view
//!
//! The registry never rebuilds anything on its own.

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use super::behavior::BehaviorMap;
use super::catalog::WidgetCatalog;
use super::descriptor::Descriptor;
use super::merge::overlay;
use super::node::Node;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::renderer::RenderTarget;
use crate::types::{Attrs, Lifecycle, NodeId, Role};

/// Override maps applied on top of a duplicated node. Overrides win on key
/// collision.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data: Attrs,
    pub behavior: BehaviorMap,
    pub style: Attrs,
}

// =============================================================================
// Registry State
// =============================================================================

#[derive(Debug, Default)]
pub struct Registry {
    objects: HashMap<NodeId, Node>,
    /// Nodes touched in the current build pass, in visit order.
    prepared: Vec<NodeId>,
    prepared_set: HashSet<NodeId>,
    /// Counter for generating unique IDs.
    id_counter: usize,
    id_prefix: String,
    roles: HashMap<Role, NodeId>,
}

impl Registry {
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn object(&self, id: &str) -> Option<&Node> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.objects.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Identity cached for a structural role.
    pub fn role(&self, role: Role) -> Option<&NodeId> {
        self.roles.get(&role)
    }

    /// The node and everything below it, including abstract template objects.
    pub fn subtree(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            let Some(node) = self.objects.get(&current) else { continue };
            stack.extend(node.children().iter().rev().cloned());
            if let Some(binding) = &node.template {
                stack.extend(binding.abstract_ids.iter().cloned());
            }
            out.push(current);
        }
        out
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Insert or overwrite by identity. Does not touch the render target.
    pub fn register(&mut self, node: Node) -> Option<Node> {
        self.objects.insert(node.id().to_string(), node)
    }

    /// Generate an identity no live node uses.
    pub fn generate_id(&mut self) -> NodeId {
        loop {
            let id = format!("{}{}", self.id_prefix, self.id_counter);
            self.id_counter += 1;
            if !self.objects.contains_key(&id) {
                return id;
            }
        }
    }

    /// Construct a node (and its nested children) from a descriptor.
    ///
    /// Template sub-objects are registered as abstract nodes. Children that
    /// fail to construct are skipped with a warning; the node itself fails
    /// only when its own type or identity is unusable.
    pub fn create_from_descriptor(
        &mut self,
        catalog: &WidgetCatalog,
        config: &EngineConfig,
        descriptor: &Descriptor,
    ) -> Result<NodeId> {
        let kind = descriptor.kind.as_deref().ok_or(EngineError::MissingType)?;
        if !catalog.contains(kind) {
            return Err(EngineError::UnknownType(kind.to_string()));
        }

        let (id, unnamed) = match &descriptor.id {
            Some(id) if self.contains(id) => return Err(EngineError::DuplicateIdentity(id.clone())),
            Some(id) => (id.clone(), false),
            None => (self.generate_id(), true),
        };

        let mut node = catalog.construct(kind, id.clone(), descriptor, config)?;
        if unnamed {
            node.flags.insert(Lifecycle::UNNAMED);
        }

        if let Some(objects) = node.template.as_ref().map(|b| b.objects.clone()) {
            let mut abstract_ids = Vec::with_capacity(objects.len());
            for object in &objects {
                match self.create_from_descriptor(catalog, config, object) {
                    Ok(object_id) => {
                        self.mark_abstract(&object_id);
                        abstract_ids.push(object_id);
                    }
                    Err(err) => warn!(host = %id, error = %err, "skipping template object"),
                }
            }
            if let Some(binding) = node.template.as_mut() {
                binding.abstract_ids = abstract_ids;
            }
        }

        if kind == config.root_type {
            self.roles.insert(Role::Root, id.clone());
        } else if kind == config.main_view_type {
            self.roles.insert(Role::MainView, id.clone());
        }

        trace!(%id, kind, "registered");
        self.register(node);

        for child in &descriptor.children {
            match self.create_from_descriptor(catalog, config, child) {
                Ok(child_id) => self.append_child(&id, &child_id)?,
                Err(err) => warn!(parent = %id, error = %err, "skipping child descriptor"),
            }
        }

        Ok(id)
    }

    /// Deep-clone a node under a fresh identity.
    ///
    /// The clone loses its unnamed marker and build snapshots, so the next
    /// build pass treats it as brand-new. Children are duplicated as well and
    /// bound to the same data override.
    pub fn duplicate(&mut self, base: &str, overrides: &Overrides) -> Result<NodeId> {
        let source = self
            .objects
            .get(base)
            .cloned()
            .ok_or_else(|| EngineError::UnknownIdentity(base.to_string()))?;

        let id = self.generate_id();
        let mut clone = source.into_identity(id.clone());
        clone.flags.remove(
            Lifecycle::UNNAMED | Lifecycle::ABSTRACT | Lifecycle::MATERIALIZED | Lifecycle::ENTERED,
        );
        clone.parent = None;
        overlay(&mut clone.data, &overrides.data);
        overlay(&mut clone.style, &overrides.style);
        clone
            .behavior
            .extend(overrides.behavior.iter().map(|(k, v)| (k.clone(), v.clone())));
        clone.clear_snapshots();

        // A copied template host starts without rows and owns its own
        // abstract objects.
        let mut children = clone.take_children();
        let abstract_ids = clone.template.as_mut().map(|binding| {
            let rows: HashSet<NodeId> = binding.clear_duplicates().into_iter().collect();
            children.retain(|c| !rows.contains(c));
            std::mem::take(&mut binding.abstract_ids)
        });
        self.register(clone);

        let inherited = Overrides {
            data: overrides.data.clone(),
            ..Default::default()
        };
        for child in children {
            let child_copy = self.duplicate(&child, &inherited)?;
            self.append_child(&id, &child_copy)?;
        }

        if let Some(abstract_ids) = abstract_ids {
            let mut copies = Vec::with_capacity(abstract_ids.len());
            for object in abstract_ids {
                let copy = self.duplicate(&object, &Overrides::default())?;
                self.mark_abstract(&copy);
                copies.push(copy);
            }
            if let Some(binding) = self.objects.get_mut(&id).and_then(|n| n.template.as_mut()) {
                binding.abstract_ids = copies;
            }
        }
        Ok(id)
    }

    fn mark_abstract(&mut self, id: &str) {
        for member in self.subtree(id) {
            if let Some(n) = self.objects.get_mut(&member) {
                n.flags.insert(Lifecycle::ABSTRACT);
            }
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: &str, child: &str) -> Result<()> {
        if !self.contains(parent) {
            return Err(EngineError::UnknownIdentity(parent.to_string()));
        }
        let previous = self
            .objects
            .get(child)
            .ok_or_else(|| EngineError::UnknownIdentity(child.to_string()))?
            .parent
            .clone();

        if let Some(previous) = previous.filter(|p| p != parent) {
            if let Some(old) = self.objects.get_mut(&previous) {
                old.remove_child_entry(child);
            }
        }
        if let Some(p) = self.objects.get_mut(parent) {
            p.push_child(child);
        }
        if let Some(c) = self.objects.get_mut(child) {
            c.parent = Some(parent.to_string());
        }
        Ok(())
    }

    /// Drop `child` from `parent`'s list and clear its back-reference.
    pub fn detach(&mut self, parent: &str, child: &str) -> bool {
        let removed = self
            .objects
            .get_mut(parent)
            .is_some_and(|p| p.remove_child_entry(child));
        if let Some(c) = self.objects.get_mut(child) {
            if c.parent.as_deref() == Some(parent) {
                c.parent = None;
            }
        }
        removed
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove a node's element from the render target, then its map entries.
    ///
    /// Fails without mutating anything when the identity is unknown or its
    /// element is missing. Removes the whole subtree and returns its identities.
    pub fn remove(&mut self, id: &str, target: &mut dyn RenderTarget) -> Result<Vec<NodeId>> {
        if !self.contains(id) {
            return Err(EngineError::UnknownIdentity(id.to_string()));
        }
        if !target.exists(id) {
            return Err(EngineError::ElementMissing(id.to_string()));
        }
        target.remove(id)?;
        Ok(self.discard(id))
    }

    /// Drop a subtree from the map only. For nodes that were never materialized.
    pub fn discard(&mut self, id: &str) -> Vec<NodeId> {
        let parent = self.objects.get(id).and_then(|n| n.parent.clone());
        if let Some(parent) = parent {
            self.detach(&parent, id);
        }
        let subtree = self.subtree(id);
        for member in &subtree {
            self.objects.remove(member);
            if self.prepared_set.remove(member) {
                self.prepared.retain(|p| p != member);
            }
            self.roles.retain(|_, v| v != member);
        }

        let gone: HashSet<NodeId> = subtree.iter().cloned().collect();
        for (host, node) in self.objects.iter_mut() {
            if let Some(binding) = node.template.as_mut() {
                if binding.forget_duplicates(&gone) {
                    trace!(host = %host, "removed duplicates dropped from template");
                }
            }
        }
        subtree
    }

    // =========================================================================
    // Prepared Set
    // =========================================================================

    /// Record a node as touched by the current build pass.
    pub fn mark_prepared(&mut self, id: &str) {
        if self.prepared_set.insert(id.to_string()) {
            self.prepared.push(id.to_string());
        }
    }

    pub fn prepared(&self) -> &[NodeId] {
        &self.prepared
    }

    /// Drain the touched set for the render commit.
    pub fn take_prepared(&mut self) -> Vec<NodeId> {
        self.prepared_set.clear();
        std::mem::take(&mut self.prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TemplateSpec;
    use crate::renderer::MemoryTarget;
    use crate::types::DOCUMENT_ROOT;
    use serde_json::json;

    fn setup() -> (Registry, WidgetCatalog, EngineConfig) {
        (Registry::new("o"), WidgetCatalog::with_builtins(), EngineConfig::default())
    }

    #[test]
    fn test_generated_ids_skip_taken() {
        let (mut registry, catalog, config) = setup();
        registry.register(Node::new("o0", "block", "div"));

        let id = registry
            .create_from_descriptor(&catalog, &config, &Descriptor::new("block"))
            .unwrap();
        assert_eq!(id, "o1");
        assert!(registry.object(&id).unwrap().flags.contains(Lifecycle::UNNAMED));
    }

    #[test]
    fn test_named_identity_collision() {
        let (mut registry, catalog, config) = setup();
        let d = Descriptor::new("block").with_id("header");
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();
        assert!(matches!(
            registry.create_from_descriptor(&catalog, &config, &d),
            Err(EngineError::DuplicateIdentity(id)) if id == "header"
        ));
    }

    #[test]
    fn test_roles_cached() {
        let (mut registry, catalog, config) = setup();
        let d = Descriptor::new("app")
            .with_id("app")
            .with_child(Descriptor::new("view").with_id("main-view"));
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();

        assert_eq!(registry.role(Role::Root).map(String::as_str), Some("app"));
        assert_eq!(registry.role(Role::MainView).map(String::as_str), Some("main-view"));
        assert_eq!(registry.object("main-view").unwrap().parent.as_deref(), Some("app"));
    }

    #[test]
    fn test_bad_child_is_skipped() {
        let (mut registry, catalog, config) = setup();
        let d = Descriptor::new("container")
            .with_id("box")
            .with_child(Descriptor::default())
            .with_child(Descriptor::new("label").with_id("ok"));
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();
        assert_eq!(registry.object("box").unwrap().children(), ["ok"]);
    }

    #[test]
    fn test_duplicate_merges_overrides() {
        let (mut registry, catalog, config) = setup();
        let d = Descriptor::new("label")
            .with_id("name")
            .with_data("name", "base")
            .with_data("kept", true)
            .with_style("variant", "muted");
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();
        registry.object_mut("name").unwrap().previous_classes = Some("stale".into());

        let overrides = Overrides {
            data: json!({ "name": "apple" }).as_object().cloned().unwrap(),
            style: json!({ "variant": "primary" }).as_object().cloned().unwrap(),
            ..Default::default()
        };
        let copy_id = registry.duplicate("name", &overrides).unwrap();
        let copy = registry.object(&copy_id).unwrap();

        assert_ne!(copy_id, "name");
        assert_eq!(copy.data["name"], "apple");
        assert_eq!(copy.data["kept"], true);
        assert_eq!(copy.style_str("variant"), Some("primary"));
        assert!(copy.previous_classes.is_none());
        assert!(!copy.flags.contains(Lifecycle::UNNAMED));
    }

    #[test]
    fn test_duplicate_is_deep() {
        let (mut registry, catalog, config) = setup();
        let d = Descriptor::new("container")
            .with_id("card")
            .with_child(Descriptor::new("label").with_id("title"));
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();

        let copy = registry.duplicate("card", &Overrides::default()).unwrap();
        let children = registry.object(&copy).unwrap().children().to_vec();
        assert_eq!(children.len(), 1);
        assert_ne!(children[0], "title");
        assert_eq!(registry.object(&children[0]).unwrap().parent.as_deref(), Some(copy.as_str()));
        assert_eq!(registry.object("card").unwrap().children(), ["title"]);
    }

    #[test]
    fn test_remove_requires_element() {
        let (mut registry, catalog, config) = setup();
        let mut target = MemoryTarget::new();
        registry
            .create_from_descriptor(&catalog, &config, &Descriptor::new("block").with_id("ghost"))
            .unwrap();

        assert!(matches!(
            registry.remove("ghost", &mut target),
            Err(EngineError::ElementMissing(_))
        ));
        assert!(registry.contains("ghost"));

        assert!(matches!(
            registry.remove("nobody", &mut target),
            Err(EngineError::UnknownIdentity(_))
        ));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let (mut registry, catalog, config) = setup();
        let mut target = MemoryTarget::new();
        let d = Descriptor::new("container")
            .with_id("card")
            .with_child(Descriptor::new("label").with_id("title"));
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();
        target
            .insert(DOCUMENT_ROOT, r#"<div id="card"><span id="title"></span></div>"#)
            .unwrap();

        let removed = registry.remove("card", &mut target).unwrap();
        assert_eq!(removed, ["card", "title"]);
        assert!(registry.is_empty());
        assert!(!target.exists("title"));
    }

    #[test]
    fn test_discard_unbinds_template_duplicate() {
        let (mut registry, catalog, config) = setup();
        let d = Descriptor::new("template").with_id("list").with_template(TemplateSpec {
            row: Descriptor::new("container"),
            objects: Vec::new(),
            source: None,
        });
        registry.create_from_descriptor(&catalog, &config, &d).unwrap();
        for (id, name) in [("row-a", "a"), ("row-b", "b")] {
            registry.register(Node::new(id, "container", "div"));
            registry.append_child("list", id).unwrap();
            let binding = registry.object_mut("list").unwrap().template.as_mut().unwrap();
            binding.duplicate_ids.push(id.into());
            binding.data_rows.push(json!({ "name": name }));
            binding.row_to_duplicate.insert(id.into(), json!({ "name": name }));
            binding.loaded = true;
        }

        registry.discard("row-a");
        let binding = registry.object("list").unwrap().template.as_ref().unwrap();
        assert_eq!(binding.duplicate_ids, ["row-b"]);
        assert_eq!(binding.data_rows, [json!({ "name": "b" })]);
        assert!(binding.is_aligned());
        assert!(!binding.loaded);
    }

    #[test]
    fn test_prepared_set_dedups() {
        let mut registry = Registry::new("o");
        registry.mark_prepared("a");
        registry.mark_prepared("b");
        registry.mark_prepared("a");
        assert_eq!(registry.prepared(), ["a", "b"]);
        assert_eq!(registry.take_prepared(), ["a", "b"]);
        assert!(registry.prepared().is_empty());
    }
}
