//! Engine context - the one value that owns all engine state.
//!
//! The registry, widget catalog, pager, configuration and the boxed
//! collaborators live here and are passed explicitly (`&mut Engine`) to
//! every operation. There is no global state.
//!
//! # Single-Threaded Contract
//!
//! An engine is confined to the thread that built it: handlers are `Rc`s and
//! collaborators are plain trait objects, so `Engine` is neither `Send` nor
//! `Sync`. An application with worker threads keeps the engine on one
//! coordination thread and sends it messages.
//!
//! # Example
//!
//! ```ignore
//! use trellis::{Engine, MemoryTarget};
//! use serde_json::json;
//!
//! let target = MemoryTarget::new();
//! let mut engine = Engine::builder().target(target.clone()).build()?;
//!
//! let report = engine.load(vec![json!({
//!     "type": "app", "id": "app",
//!     "children": [{ "type": "view", "id": "main-view",
//!                    "children": [{ "type": "page", "id": "home" }] }]
//! })]);
//! assert!(report.warnings.is_empty());
//!
//! engine.rebuild("app", None)?;
//! engine.navigate("#/")?;
//! assert_eq!(engine.pager().current().as_deref(), Some("home"));
//! ```

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{trace, warn};

use crate::config::EngineConfig;
use crate::engine::{Behavior, Constructor, Descriptor, Event, Node, Registry, WidgetCatalog};
use crate::error::{EngineError, Result};
use crate::pipeline;
use crate::renderer::{MemoryTarget, RenderTarget};
use crate::router::{self, Direction, Pager};
use crate::services::{
    Network, Progress, QueuedNetwork, RecordingTransitions, Request, Transition, TransitionRunner,
};
use crate::template::{self, DuplicateOptions, PendingLoad};
use crate::theme::{StyleResolver, VariantResolver};
use crate::types::{Attrs, Lifecycle, NodeId, Ticket};

/// Deferred work run with the engine once something completes.
pub type Continuation = Box<dyn FnOnce(&mut Engine)>;

/// Deferred work run with the failure reason.
pub type FailureContinuation = Box<dyn FnOnce(&mut Engine, &str)>;

// =============================================================================
// Load Report
// =============================================================================

/// A descriptor skipped during [`Engine::load`].
#[derive(Debug)]
pub struct LoadWarning {
    /// Position in the loaded list.
    pub index: usize,
    pub error: EngineError,
}

/// Outcome of a bulk load. Loading never fails as a whole.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Identities of the top-level nodes created, in order.
    pub created: Vec<NodeId>,
    pub warnings: Vec<LoadWarning>,
}

struct PendingTransition {
    transition: Transition,
    on_complete: Option<Continuation>,
}

// =============================================================================
// Engine
// =============================================================================

pub struct Engine {
    pub(crate) registry: Registry,
    pub(crate) catalog: WidgetCatalog,
    pub(crate) config: EngineConfig,
    pub(crate) target: Box<dyn RenderTarget>,
    pub(crate) styles: Box<dyn StyleResolver>,
    pub(crate) transitions: Box<dyn TransitionRunner>,
    pub(crate) network: Box<dyn Network>,
    pub(crate) pager: Pager,
    pub(crate) pending_requests: HashMap<Ticket, PendingLoad>,
    pending_transitions: HashMap<Ticket, PendingTransition>,
    next_ticket: u64,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn catalog(&self) -> &WidgetCatalog {
        &self.catalog
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    pub fn target(&self) -> &dyn RenderTarget {
        self.target.as_ref()
    }

    pub fn object(&self, id: &str) -> Option<&Node> {
        self.registry.object(id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.registry.object_mut(id)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create every descriptor in order. Bad entries are skipped and reported.
    pub fn load(&mut self, values: impl IntoIterator<Item = Value>) -> LoadReport {
        let mut report = LoadReport::default();
        for (index, value) in values.into_iter().enumerate() {
            let created = Descriptor::from_value(value)
                .map_err(EngineError::from)
                .and_then(|d| self.create(d));
            match created {
                Ok(id) => report.created.push(id),
                Err(error) => {
                    warn!(index, %error, "skipping descriptor");
                    report.warnings.push(LoadWarning { index, error });
                }
            }
        }
        report
    }

    /// Create a node of `kind` from a descriptor.
    pub fn create_object(&mut self, kind: &str, mut descriptor: Descriptor) -> Result<NodeId> {
        descriptor.kind = Some(kind.to_string());
        self.create(descriptor)
    }

    /// Create a node (and nested children) from a typed descriptor. Pages in
    /// the new subtree are registered with the pager.
    pub fn create(&mut self, descriptor: Descriptor) -> Result<NodeId> {
        let id = self
            .registry
            .create_from_descriptor(&self.catalog, &self.config, &descriptor)?;

        let pages: Vec<NodeId> = self
            .registry
            .subtree(&id)
            .into_iter()
            .filter(|member| {
                self.registry.object(member).is_some_and(|n| {
                    !n.is_abstract() && n.page.as_ref().is_some_and(|p| p.origin.is_none())
                })
            })
            .collect();
        for page in pages {
            router::add_page(self, &page)?;
        }
        Ok(id)
    }

    // =========================================================================
    // Tree Operations
    // =========================================================================

    /// Build and commit a subtree. `on_finish` runs after the commit.
    pub fn rebuild(&mut self, id: &str, on_finish: Option<Continuation>) -> Result<()> {
        pipeline::rebuild(self, id, on_finish)
    }

    /// Attach `child` under `parent`.
    ///
    /// A child whose element lives elsewhere is removed from the target so
    /// the next rebuild of `parent` renders it in its new place.
    pub fn append_child(&mut self, parent: &str, child: &str) -> Result<()> {
        let moved = self
            .registry
            .object(child)
            .is_some_and(|n| n.parent.as_deref() != Some(parent));
        self.registry.append_child(parent, child)?;
        if moved && self.target.exists(child) {
            self.target.remove(child)?;
            self.dematerialize(child);
        }
        Ok(())
    }

    /// Detach `child` from `parent` and remove its element. The node stays
    /// registered and can be attached again. Returns false if `child` was
    /// not a child of `parent`.
    pub fn remove_child(&mut self, parent: &str, child: &str) -> Result<bool> {
        if !self.registry.contains(parent) {
            return Err(EngineError::UnknownIdentity(parent.to_string()));
        }
        if !self.registry.detach(parent, child) {
            return Ok(false);
        }
        if self.target.exists(child) {
            self.target.remove(child)?;
        }
        self.dematerialize(child);
        Ok(true)
    }

    /// Remove a node's element and registry entries. Fails loudly when the
    /// identity is unknown or has no element.
    pub fn remove(&mut self, id: &str) -> Result<Vec<NodeId>> {
        let removed = self.registry.remove(id, self.target.as_mut())?;
        self.pager.forget(&removed);
        Ok(removed)
    }

    fn dematerialize(&mut self, id: &str) {
        for member in self.registry.subtree(id) {
            if let Some(node) = self.registry.object_mut(&member) {
                node.flags.remove(Lifecycle::MATERIALIZED | Lifecycle::ENTERED);
                node.clear_snapshots();
            }
        }
    }

    // =========================================================================
    // Behaviors
    // =========================================================================

    /// Invoke a node's `name` handler. Returns false if it has none.
    pub fn dispatch(&mut self, id: &str, name: &str, value: Value) -> Result<bool> {
        self.dispatch_event(Event::new(id, name, value))
    }

    pub fn dispatch_event(&mut self, event: Event) -> Result<bool> {
        let handler = self
            .registry
            .object(&event.target)
            .ok_or_else(|| EngineError::UnknownIdentity(event.target.clone()))?
            .behavior
            .get(&event.name)
            .and_then(Behavior::as_handler)
            .cloned();
        match handler {
            Some(handler) => {
                trace!(target = %event.target, name = %event.name, "dispatch");
                handler(self, &event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn click(&mut self, id: &str) -> Result<bool> {
        self.dispatch(id, "click", Value::Null)
    }

    // =========================================================================
    // Collaborator Completion
    // =========================================================================

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    /// Run a transition. Show transitions make the element visible when they
    /// start; hide transitions hide it when they complete.
    pub fn run_transition(&mut self, transition: Transition, on_complete: Option<Continuation>) {
        let ticket = self.issue_ticket();
        if transition.kind.is_show() {
            self.apply_visibility(&transition.target, true);
        }
        trace!(target = %transition.target, kind = ?transition.kind, %ticket, "transition");
        let progress = self.transitions.run(&transition, ticket);
        let pending = PendingTransition {
            transition,
            on_complete,
        };
        match progress {
            Progress::Done => self.complete_transition(pending),
            Progress::Pending => {
                self.pending_transitions.insert(ticket, pending);
            }
        }
    }

    /// Report completion of a transition that answered `Pending`.
    pub fn finish_transition(&mut self, ticket: Ticket) -> Result<()> {
        let pending = self
            .pending_transitions
            .remove(&ticket)
            .ok_or(EngineError::UnknownTicket(ticket))?;
        self.complete_transition(pending);
        Ok(())
    }

    fn complete_transition(&mut self, pending: PendingTransition) {
        if !pending.transition.kind.is_show() {
            self.apply_visibility(&pending.transition.target, false);
        }
        if let Some(on_complete) = pending.on_complete {
            on_complete(self);
        }
    }

    fn apply_visibility(&mut self, id: &str, visible: bool) {
        if !self.target.exists(id) {
            return;
        }
        if let Err(err) = self.target.set_visible(id, visible) {
            warn!(id, error = %err, "visibility change failed");
        }
    }

    pub(crate) fn issue_request(&mut self, request: Request, pending: PendingLoad) -> Ticket {
        let ticket = self.issue_ticket();
        self.pending_requests.insert(ticket, pending);
        self.network.request(request, ticket);
        ticket
    }

    /// Deliver a network response.
    pub fn complete_request(
        &mut self,
        ticket: Ticket,
        result: std::result::Result<Value, String>,
    ) -> Result<()> {
        let pending = self
            .pending_requests
            .remove(&ticket)
            .ok_or(EngineError::UnknownTicket(ticket))?;
        template::complete(self, pending, result)
    }

    // =========================================================================
    // Templates & Pages
    // =========================================================================

    pub fn duplicate_with_data(
        &mut self,
        host: &str,
        data: Value,
        options: DuplicateOptions,
    ) -> Result<Vec<NodeId>> {
        template::duplicate_with_data(self, host, data, options)
    }

    pub fn add_page(&mut self, id: &str) -> Result<()> {
        router::add_page(self, id)
    }

    pub fn set_main_page(&mut self, name: &str) -> Result<()> {
        router::set_main_page(self, name)
    }

    pub fn show_page(&mut self, name: &str, params: &Attrs) -> Result<()> {
        router::show_page(self, name, params)
    }

    pub fn navigate(&mut self, hash: &str) -> Result<Direction> {
        router::navigate(self, hash)
    }

    /// Time out a template wait that has taken too long.
    pub fn expire(&mut self, now: Instant) -> bool {
        self.pager.expire(now)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Engine`]. Every collaborator defaults to its headless
/// implementation.
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    target: Option<Box<dyn RenderTarget>>,
    styles: Option<Box<dyn StyleResolver>>,
    transitions: Option<Box<dyn TransitionRunner>>,
    network: Option<Box<dyn Network>>,
    widgets: Vec<(String, Constructor)>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn target(mut self, target: impl RenderTarget + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    pub fn styles(mut self, styles: impl StyleResolver + 'static) -> Self {
        self.styles = Some(Box::new(styles));
        self
    }

    pub fn transitions(mut self, transitions: impl TransitionRunner + 'static) -> Self {
        self.transitions = Some(Box::new(transitions));
        self
    }

    pub fn network(mut self, network: impl Network + 'static) -> Self {
        self.network = Some(Box::new(network));
        self
    }

    /// Register an extra widget type next to the built-ins.
    pub fn widget(mut self, tag: impl Into<String>, constructor: Constructor) -> Self {
        self.widgets.push((tag.into(), constructor));
        self
    }

    /// Fails if a widget tag is invalid or already taken.
    pub fn build(self) -> Result<Engine> {
        let config = self.config.unwrap_or_default();
        let mut catalog = WidgetCatalog::with_builtins();
        for (tag, constructor) in &self.widgets {
            catalog.register(tag, *constructor)?;
        }

        Ok(Engine {
            registry: Registry::new(config.id_prefix.clone()),
            catalog,
            target: self.target.unwrap_or_else(|| Box::new(MemoryTarget::new())),
            styles: self
                .styles
                .unwrap_or_else(|| Box::new(VariantResolver::new(config.theme.clone()))),
            transitions: self
                .transitions
                .unwrap_or_else(|| Box::new(RecordingTransitions::immediate())),
            network: self.network.unwrap_or_else(|| Box::new(QueuedNetwork::new())),
            pager: Pager::new(config.template_timeout()),
            pending_requests: HashMap::new(),
            pending_transitions: HashMap::new(),
            next_ticket: 0,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{handler, construct_with, VariantDefaults};
    use crate::services::TransitionKind;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn badge(id: NodeId, d: &Descriptor, config: &EngineConfig) -> Node {
        construct_with(&VariantDefaults::new("badge").tag("span"), id, d, config)
    }

    #[test]
    fn test_load_reports_bad_entries() {
        let mut engine = Engine::builder().build().unwrap();
        let report = engine.load(vec![
            json!({ "type": "block", "id": "a" }),
            json!({ "id": "untyped" }),
            json!({ "type": "carousel" }),
            json!({ "type": "block", "children": "not a list" }),
            json!({ "type": "label", "id": "b" }),
        ]);

        assert_eq!(report.created, ["a", "b"]);
        let skipped: Vec<usize> = report.warnings.iter().map(|w| w.index).collect();
        assert_eq!(skipped, [1, 2, 3]);
        assert!(matches!(report.warnings[0].error, EngineError::MissingType));
        assert!(matches!(report.warnings[1].error, EngineError::UnknownType(_)));
        assert!(matches!(report.warnings[2].error, EngineError::Json(_)));
    }

    #[test]
    fn test_custom_widget() {
        let mut engine = Engine::builder().widget("badge", badge).build().unwrap();
        let id = engine.create_object("badge", Descriptor::default()).unwrap();
        assert_eq!(engine.object(&id).unwrap().tag, "span");

        assert!(Engine::builder().widget("page", badge).build().is_err());
    }

    #[test]
    fn test_pages_register_on_create() {
        let mut engine = Engine::builder().build().unwrap();
        engine
            .create(
                Descriptor::new("view")
                    .with_id("v")
                    .with_child(Descriptor::new("page").with_id("home"))
                    .with_child(Descriptor::new("page").with_id("about").with_page("info", None)),
            )
            .unwrap();
        assert_eq!(engine.pager().page("home").map(String::as_str), Some("home"));
        assert_eq!(engine.pager().page("info").map(String::as_str), Some("about"));
        assert_eq!(engine.pager().main_page(), Some("home"));
    }

    #[test]
    fn test_dispatch() {
        let mut engine = Engine::builder().build().unwrap();
        engine.create(Descriptor::new("button").with_id("ok")).unwrap();
        assert!(!engine.click("ok").unwrap());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        engine.object_mut("ok").unwrap().behavior.insert(
            "click".into(),
            handler(move |engine, event| {
                log.borrow_mut().push(event.target.clone());
                engine.object_mut("ok").unwrap().set_style("variant", "success");
            }),
        );
        assert!(engine.click("ok").unwrap());
        assert_eq!(*seen.borrow(), ["ok"]);
        assert_eq!(engine.object("ok").unwrap().style_str("variant"), Some("success"));
        assert!(matches!(engine.click("ghost"), Err(EngineError::UnknownIdentity(_))));
    }

    #[test]
    fn test_deferred_transition_completes_once() {
        let transitions = RecordingTransitions::deferred();
        let target = MemoryTarget::new();
        let mut engine = Engine::builder()
            .target(target.clone())
            .transitions(transitions.clone())
            .build()
            .unwrap();
        engine.create(Descriptor::new("block").with_id("panel")).unwrap();
        engine.rebuild("panel", None).unwrap();

        let done = Rc::new(RefCell::new(0));
        let count = done.clone();
        engine.run_transition(
            Transition::new("panel", TransitionKind::Hide),
            Some(Box::new(move |_| *count.borrow_mut() += 1)),
        );
        assert!(target.is_visible("panel"));
        let ticket = transitions.take_pending()[0];

        engine.finish_transition(ticket).unwrap();
        assert_eq!(*done.borrow(), 1);
        assert!(!target.is_visible("panel"));
        assert!(matches!(
            engine.finish_transition(ticket),
            Err(EngineError::UnknownTicket(_))
        ));
    }

    #[test]
    fn test_remove_child_keeps_registration() {
        let target = MemoryTarget::new();
        let mut engine = Engine::builder().target(target.clone()).build().unwrap();
        engine
            .create(
                Descriptor::new("container")
                    .with_id("list")
                    .with_child(Descriptor::new("label").with_id("item")),
            )
            .unwrap();
        engine.rebuild("list", None).unwrap();

        assert!(engine.remove_child("list", "item").unwrap());
        assert!(!target.exists("item"));
        assert!(engine.registry().contains("item"));
        assert!(!engine.object("item").unwrap().is_materialized());
        assert!(!engine.remove_child("list", "item").unwrap());

        engine.append_child("list", "item").unwrap();
        engine.rebuild("list", None).unwrap();
        assert!(target.exists("item"));
    }

    #[test]
    fn test_append_child_moves_element() {
        let target = MemoryTarget::new();
        let mut engine = Engine::builder().target(target.clone()).build().unwrap();
        engine
            .create(
                Descriptor::new("container")
                    .with_id("root")
                    .with_child(Descriptor::new("container").with_id("left").with_child(Descriptor::new("label").with_id("x")))
                    .with_child(Descriptor::new("container").with_id("right")),
            )
            .unwrap();
        engine.rebuild("root", None).unwrap();

        engine.append_child("right", "x").unwrap();
        engine.rebuild("right", None).unwrap();
        assert_eq!(target.children_of("right"), ["x"]);
        assert!(target.children_of("left").is_empty());
        assert_eq!(engine.object("x").unwrap().parent.as_deref(), Some("right"));
    }

    #[test]
    fn test_remove_forgets_page() {
        let mut engine = Engine::builder().build().unwrap();
        engine.create(Descriptor::new("page").with_id("home")).unwrap();
        engine.rebuild("home", None).unwrap();
        engine.remove("home").unwrap();
        assert!(engine.pager().page("home").is_none());
    }
}
