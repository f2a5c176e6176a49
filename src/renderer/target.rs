//! Render target - the adapter the engine writes elements through.
//!
//! The engine only ever talks to a [`RenderTarget`]: existence checks by
//! identity, raw markup insertion under a parent, removal, class mutation,
//! visibility, document title and geometry queries.
//!
//! [`MemoryTarget`] is the headless implementation. It parses inserted markup
//! into an element tree and records every mutation, so tests can assert on
//! both the resulting tree and how many writes produced it.
//!
//! ```ignore
//! let target = MemoryTarget::new();
//! let mut engine = Engine::builder().target(target.clone()).build()?;
//! engine.rebuild("app", None)?;
//! assert!(target.exists("app"));
//! assert_eq!(target.mutation_count(), 1);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use super::markup::is_void;
use crate::error::{EngineError, Result};
use crate::types::{NodeId, Rect, DOCUMENT_ROOT};

// =============================================================================
// Trait
// =============================================================================

/// Element store the engine materializes nodes into.
pub trait RenderTarget {
    /// Whether an element with this identity exists.
    fn exists(&self, id: &str) -> bool;

    /// Append raw markup as the last children of `parent`.
    fn insert(&mut self, parent: &str, markup: &str) -> Result<()>;

    /// Remove an element and everything below it.
    fn remove(&mut self, id: &str) -> Result<()>;

    /// Replace the class attribute of an element.
    fn set_class(&mut self, id: &str, classes: &str) -> Result<()>;

    /// Show or hide an element regardless of its classes.
    fn set_visible(&mut self, id: &str, visible: bool) -> Result<()>;

    fn set_title(&mut self, title: &str);

    /// Bounding box of an element. Only leaf widgets consume this.
    fn geometry(&self, id: &str) -> Option<Rect>;
}

// =============================================================================
// Memory Target
// =============================================================================

/// A write the engine made against a [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert { parent: NodeId, ids: Vec<NodeId> },
    Remove(NodeId),
    SetClass { id: NodeId, classes: String },
    SetVisible { id: NodeId, visible: bool },
    SetTitle(String),
}

/// One element of the headless tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub parent: NodeId,
    pub children: Vec<NodeId>,
    pub classes: String,
    /// Unescaped text content directly inside this element.
    pub text: String,
    /// Inline visibility set through [`RenderTarget::set_visible`].
    pub visible: Option<bool>,
    pub geometry: Rect,
}

#[derive(Debug, Default)]
struct Dom {
    elements: HashMap<NodeId, Element>,
    root_children: Vec<NodeId>,
    title: String,
    log: Vec<Mutation>,
}

/// Headless render target. Cloning yields another handle to the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    dom: Rc<RefCell<Dom>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, id: &str) -> Option<Element> {
        self.dom.borrow().elements.get(id).cloned()
    }

    pub fn class_of(&self, id: &str) -> Option<String> {
        self.dom.borrow().elements.get(id).map(|e| e.classes.clone())
    }

    pub fn text_of(&self, id: &str) -> Option<String> {
        self.dom.borrow().elements.get(id).map(|e| e.text.clone())
    }

    /// Inline visibility wins; otherwise an `is-hidden` class hides.
    pub fn is_visible(&self, id: &str) -> bool {
        let dom = self.dom.borrow();
        dom.elements.get(id).is_some_and(|e| {
            e.visible
                .unwrap_or_else(|| !e.classes.split_whitespace().any(|c| c == "is-hidden"))
        })
    }

    /// Element children of a parent, `DOCUMENT_ROOT` included.
    pub fn children_of(&self, id: &str) -> Vec<NodeId> {
        let dom = self.dom.borrow();
        if id == DOCUMENT_ROOT {
            return dom.root_children.clone();
        }
        dom.elements.get(id).map(|e| e.children.clone()).unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.dom.borrow().title.clone()
    }

    pub fn set_geometry(&self, id: &str, rect: Rect) {
        if let Some(e) = self.dom.borrow_mut().elements.get_mut(id) {
            e.geometry = rect;
        }
    }

    pub fn mutation_count(&self) -> usize {
        self.dom.borrow().log.len()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.dom.borrow().log.clone()
    }

    pub fn clear_mutations(&self) {
        self.dom.borrow_mut().log.clear();
    }
}

impl Dom {
    fn children_mut(&mut self, parent: &str) -> Option<&mut Vec<NodeId>> {
        if parent == DOCUMENT_ROOT {
            Some(&mut self.root_children)
        } else {
            self.elements.get_mut(parent).map(|e| &mut e.children)
        }
    }

    fn collect_subtree(&self, id: &str, out: &mut Vec<NodeId>) {
        out.push(id.to_string());
        if let Some(e) = self.elements.get(id) {
            for child in &e.children {
                self.collect_subtree(child, out);
            }
        }
    }
}

impl RenderTarget for MemoryTarget {
    fn exists(&self, id: &str) -> bool {
        id == DOCUMENT_ROOT || self.dom.borrow().elements.contains_key(id)
    }

    fn insert(&mut self, parent: &str, markup: &str) -> Result<()> {
        if !self.exists(parent) {
            return Err(EngineError::ElementMissing(parent.to_string()));
        }
        let parsed = parse(parent, markup)?;
        let mut dom = self.dom.borrow_mut();
        if let Some(taken) = parsed.elements.iter().find(|(id, _)| dom.elements.contains_key(id)) {
            return Err(EngineError::Markup(format!("element `{}` already exists", taken.0)));
        }

        trace!(parent, ids = ?parsed.top_level, "insert");
        if let Some(siblings) = dom.children_mut(parent) {
            siblings.extend(parsed.top_level.iter().cloned());
        }
        dom.elements.extend(parsed.elements);
        dom.log.push(Mutation::Insert {
            parent: parent.to_string(),
            ids: parsed.top_level,
        });
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let mut dom = self.dom.borrow_mut();
        let parent = dom
            .elements
            .get(id)
            .map(|e| e.parent.clone())
            .ok_or_else(|| EngineError::ElementMissing(id.to_string()))?;

        let mut subtree = Vec::new();
        dom.collect_subtree(id, &mut subtree);
        for member in &subtree {
            dom.elements.remove(member);
        }
        if let Some(siblings) = dom.children_mut(&parent) {
            siblings.retain(|c| c != id);
        }
        trace!(id, "remove");
        dom.log.push(Mutation::Remove(id.to_string()));
        Ok(())
    }

    fn set_class(&mut self, id: &str, classes: &str) -> Result<()> {
        let mut dom = self.dom.borrow_mut();
        let element = dom
            .elements
            .get_mut(id)
            .ok_or_else(|| EngineError::ElementMissing(id.to_string()))?;
        element.classes = classes.to_string();
        dom.log.push(Mutation::SetClass {
            id: id.to_string(),
            classes: classes.to_string(),
        });
        Ok(())
    }

    fn set_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        let mut dom = self.dom.borrow_mut();
        let element = dom
            .elements
            .get_mut(id)
            .ok_or_else(|| EngineError::ElementMissing(id.to_string()))?;
        element.visible = Some(visible);
        dom.log.push(Mutation::SetVisible {
            id: id.to_string(),
            visible,
        });
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        let mut dom = self.dom.borrow_mut();
        dom.title = title.to_string();
        dom.log.push(Mutation::SetTitle(title.to_string()));
    }

    fn geometry(&self, id: &str) -> Option<Rect> {
        self.dom.borrow().elements.get(id).map(|e| e.geometry)
    }
}

// =============================================================================
// Markup Scanner
// =============================================================================

struct Parsed {
    elements: Vec<(NodeId, Element)>,
    top_level: Vec<NodeId>,
}

/// Scan engine-produced markup into elements.
///
/// Only elements carrying an `id` are tracked; anonymous elements still
/// count for nesting so their text lands on the nearest identified ancestor.
fn parse(parent: &str, markup: &str) -> Result<Parsed> {
    let mut elements: Vec<(NodeId, Element)> = Vec::new();
    let mut top_level = Vec::new();
    // (tag, index into `elements` if identified)
    let mut stack: Vec<(String, Option<usize>)> = Vec::new();
    let mut rest = markup;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            append_text(&mut elements, &stack, rest);
            break;
        };
        append_text(&mut elements, &stack, &rest[..lt]);
        let after = &rest[lt + 1..];
        let gt = after
            .find('>')
            .ok_or_else(|| EngineError::Markup("unterminated tag".into()))?;
        let body = &after[..gt];
        rest = &after[gt + 1..];

        if let Some(closing) = body.strip_prefix('/') {
            let closing = closing.trim();
            match stack.pop() {
                Some((tag, _)) if tag == closing => continue,
                _ => return Err(EngineError::Markup(format!("unexpected `</{closing}>`"))),
            }
        }

        let self_closing = body.ends_with('/');
        let body = body.trim_end_matches('/');
        let (tag, attrs) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let tag = tag.to_ascii_lowercase();
        let id = attribute(attrs, "id");
        let owner = stack
            .iter()
            .rev()
            .find_map(|(_, idx)| *idx)
            .map(|idx| elements[idx].0.clone());

        let index = match id {
            Some(id) => {
                if elements.iter().any(|(existing, _)| *existing == id) {
                    return Err(EngineError::Markup(format!("duplicate element id `{id}`")));
                }
                let element_parent = owner.clone().unwrap_or_else(|| parent.to_string());
                match owner.as_ref().and_then(|o| elements.iter_mut().find(|(eid, _)| eid == o)) {
                    Some((_, owner_element)) => owner_element.children.push(id.clone()),
                    None => top_level.push(id.clone()),
                }
                elements.push((
                    id,
                    Element {
                        tag: tag.clone(),
                        parent: element_parent,
                        classes: attribute(attrs, "class").unwrap_or_default(),
                        ..Default::default()
                    },
                ));
                Some(elements.len() - 1)
            }
            None => None,
        };

        if !self_closing && !is_void(&tag) {
            stack.push((tag, index));
        }
    }

    if let Some((tag, _)) = stack.pop() {
        return Err(EngineError::Markup(format!("unclosed `<{tag}>`")));
    }
    Ok(Parsed { elements, top_level })
}

fn append_text(elements: &mut [(NodeId, Element)], stack: &[(String, Option<usize>)], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(idx) = stack.iter().rev().find_map(|(_, idx)| *idx) {
        elements[idx].1.text.push_str(&unescape(text));
    }
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let mut search = attrs;
    while let Some(pos) = search.find(&needle) {
        let boundary = pos == 0 || search[..pos].ends_with(char::is_whitespace);
        let value_start = pos + needle.len();
        if boundary {
            let value = &search[value_start..];
            let end = value.find('"')?;
            return Some(unescape(&value[..end]));
        }
        search = &search[value_start..];
    }
    None
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
