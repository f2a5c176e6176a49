//! Build pass - node subtree → markup fragments.
//!
//! # Contract
//!
//! - A node whose element already exists gets a **style-only refresh**: its
//!   classes are recomputed and written only if they differ from the ones
//!   the target holds. No markup is generated for it, so refreshing an
//!   existing node costs O(1) in its subtree size (its children are still
//!   visited, each under the same rule).
//! - A node without an element produces full markup: opening tag with
//!   identity, classes and raw attributes, rendered text, children in
//!   child-list order, closing tag unless the tag is void.
//! - Every visited node lands in the registry's prepared set, whether or not
//!   it produced markup. Abstract template objects are never visited.
//!
//! Markup for new children of an existing node comes back as a separate
//! [`Fragment`] addressed to that node.

use tracing::trace;

use crate::context::Engine;
use crate::error::{EngineError, Result};
use crate::renderer::{close_tag, escape, is_void, open_tag, render_text, StringBuilder};
use crate::types::{NodeId, DOCUMENT_ROOT};

/// Markup to append under an existing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub parent: NodeId,
    pub markup: String,
}

/// Run the build pass over `id` and its subtree.
pub fn prepare_build(engine: &mut Engine, id: &str) -> Result<Vec<Fragment>> {
    let parent = engine
        .registry
        .object(id)
        .ok_or_else(|| EngineError::UnknownIdentity(id.to_string()))?
        .parent
        .clone()
        .unwrap_or_else(|| DOCUMENT_ROOT.to_string());

    let mut fragments = Vec::new();
    if let Some(markup) = prepare(engine, id, &mut fragments)? {
        fragments.insert(0, Fragment { parent, markup });
    }
    Ok(fragments)
}

fn prepare(engine: &mut Engine, id: &str, fragments: &mut Vec<Fragment>) -> Result<Option<String>> {
    let node = engine
        .registry
        .object(id)
        .ok_or_else(|| EngineError::UnknownIdentity(id.to_string()))?;
    if node.is_abstract() {
        return Ok(None);
    }

    let classes = engine.styles.resolve_classes(node);
    let children = node.children().to_vec();

    if engine.target.exists(id) {
        let stale = node.previous_classes.as_deref() != Some(classes.as_str());
        engine.registry.mark_prepared(id);
        if stale {
            trace!(id, %classes, "class refresh");
            engine.target.set_class(id, &classes)?;
        }
        snapshot(engine, id, classes);

        for child in children {
            if let Some(markup) = prepare(engine, &child, fragments)? {
                fragments.push(Fragment {
                    parent: id.to_string(),
                    markup,
                });
            }
        }
        return Ok(None);
    }

    let mut sb = StringBuilder::new();
    let tag = node.tag.clone();
    open_tag(&mut sb, &tag, id, &classes, &node.attributes);
    if let Some(text) = node.text() {
        sb.push(escape(&render_text(text, &node.data)));
    }
    engine.registry.mark_prepared(id);
    if !is_void(&tag) {
        for child in children {
            if let Some(markup) = prepare(engine, &child, fragments)? {
                sb.push(markup);
            }
        }
        close_tag(&mut sb, &tag);
    }
    snapshot(engine, id, classes);
    Ok(Some(sb.join("")))
}

/// Record what this pass produced. The behavior snapshot is only replaced
/// when the behavior map actually changed.
fn snapshot(engine: &mut Engine, id: &str, classes: String) {
    let Some(node) = engine.registry.object_mut(id) else { return };
    node.current_classes = Some(classes);
    node.previous_classes = node.current_classes.clone();
    if node.behavior_snapshot.as_ref() != Some(&node.behavior) {
        node.behavior_snapshot = Some(node.behavior.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Descriptor;
    use crate::renderer::{MemoryTarget, RenderTarget};

    fn engine() -> (Engine, MemoryTarget) {
        let target = MemoryTarget::new();
        let engine = Engine::builder().target(target.clone()).build().unwrap();
        (engine, target)
    }

    #[test]
    fn test_full_markup_for_new_subtree() {
        let (mut engine, _) = engine();
        let d = Descriptor::new("container")
            .with_id("card")
            .with_attribute("role", "list")
            .with_child(
                Descriptor::new("label")
                    .with_id("name")
                    .with_behavior("text", "<{{name}}>")
                    .with_data("name", "Dvir"),
            )
            .with_child(Descriptor::new("image").with_id("pic"));
        engine.create(d).unwrap();

        let fragments = prepare_build(&mut engine, "card").unwrap();
        assert_eq!(
            fragments,
            [Fragment {
                parent: DOCUMENT_ROOT.into(),
                markup: concat!(
                    r#"<div id="card" class="is-block" role="list">"#,
                    r#"<span id="name">&lt;Dvir&gt;</span>"#,
                    r#"<img id="pic">"#,
                    "</div>"
                )
                .into(),
            }]
        );
        assert_eq!(engine.registry().prepared(), ["card", "name", "pic"]);
    }

    #[test]
    fn test_existing_node_only_refreshes_classes() {
        let (mut engine, mut target) = engine();
        engine.create(Descriptor::new("block").with_id("box")).unwrap();
        target.insert(DOCUMENT_ROOT, r#"<div id="box"></div>"#).unwrap();
        engine.registry_mut().object_mut("box").unwrap().set_style("variant", "primary");
        target.clear_mutations();

        let fragments = prepare_build(&mut engine, "box").unwrap();
        assert!(fragments.is_empty());
        assert_eq!(target.class_of("box").as_deref(), Some("v-primary"));
        assert_eq!(target.mutation_count(), 1);

        let again = prepare_build(&mut engine, "box").unwrap();
        assert!(again.is_empty());
        assert_eq!(target.mutation_count(), 1);
    }

    #[test]
    fn test_new_child_of_existing_parent() {
        let (mut engine, mut target) = engine();
        engine.create(Descriptor::new("block").with_id("list")).unwrap();
        target.insert(DOCUMENT_ROOT, r#"<div id="list"></div>"#).unwrap();
        let item = engine.create(Descriptor::new("label").with_id("item")).unwrap();
        engine.append_child("list", &item).unwrap();

        let fragments = prepare_build(&mut engine, "list").unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].parent, "list");
        assert_eq!(fragments[0].markup, r#"<span id="item"></span>"#);
    }

    #[test]
    fn test_behavior_snapshot_kept_when_unchanged() {
        let (mut engine, _) = engine();
        engine
            .create(Descriptor::new("label").with_id("l").with_behavior("text", "hi"))
            .unwrap();
        prepare_build(&mut engine, "l").unwrap();
        let first = engine.object("l").unwrap().behavior_snapshot.clone();
        assert!(first.is_some());

        engine.registry_mut().take_prepared();
        prepare_build(&mut engine, "l").unwrap();
        assert_eq!(engine.object("l").unwrap().behavior_snapshot, first);
    }
}
