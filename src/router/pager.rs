//! Pager - page registry and the page lifecycle state machine.
//!
//! # States
//!
//! ```text
//!            navigate
//!   Idle ───────────────▶ Resolving ──────────────────────▶ Transitioning ──▶ Idle
//!    ▲                        │        page found                (show complete)
//!    │                        │ template page, no
//!    │                        ▼ page for these params
//!    └──── timeout/failure ── AwaitingTemplateData ── data ready ──▶ Resolving (same path)
//! ```
//!
//! Resolution looks up the exact `name + params` key first, then the bare
//! page name. A template-backed page without a page for the requested
//! parameters suspends in `AwaitingTemplateData` until the template engine
//! has materialized one; the continuation carries a generation and does
//! nothing once the pager has moved on.
//!
//! # Transition Ordering
//!
//! 1. the previous page (unless template-backed) is hidden
//! 2. the new page is shown; the very first page is shown without an effect
//! 3. when the show completes: the page's `reload` hook runs, the title is
//!    restored, and a template-backed previous page has its layer lowered
//!    and is hidden
//!
//! Navigating to the page already displayed does nothing. This compares
//! identities, since several paths can resolve to the same page.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;
use spark_signals::{signal, Signal};
use tracing::{debug, warn};

use super::history::{Direction, HashHistory};
use super::route::{page_key, Route};
use crate::context::Engine;
use crate::error::{EngineError, Result};
use crate::pipeline::rebuild;
use crate::services::{Transition, TransitionKind, TransitionOptions};
use crate::template::{duplicate_with_data, load, DuplicateOptions, LoadOptions};
use crate::types::{Attrs, NodeId};

// =============================================================================
// State & Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerState {
    Idle,
    Resolving {
        path: String,
    },
    AwaitingTemplateData {
        path: String,
        /// Template page host the data is loading for.
        page: NodeId,
        generation: u64,
        since: Instant,
    },
    Transitioning {
        from: Option<NodeId>,
        to: NodeId,
    },
}

/// Observable outcomes of navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerEvent {
    Navigated { from: Option<NodeId>, to: NodeId },
    /// No registered page matches the path.
    Unresolved { path: String },
    TemplateLoadFailed { path: String, reason: String },
    TemplateLoadTimedOut { path: String },
}

// =============================================================================
// Pager
// =============================================================================

pub struct Pager {
    /// Page name → identity.
    pages: HashMap<String, NodeId>,
    /// Page key (`name` + params) → identity of the materialized template page.
    param_pages: HashMap<String, NodeId>,
    main_page: Option<String>,
    current: Signal<Option<NodeId>>,
    previous: Option<NodeId>,
    history: HashHistory,
    state: PagerState,
    generation: u64,
    title: Option<String>,
    events: Vec<PagerEvent>,
    template_timeout: Duration,
}

impl fmt::Debug for Pager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("pages", &self.pages)
            .field("param_pages", &self.param_pages)
            .field("main_page", &self.main_page)
            .field("current", &self.current.get())
            .field("previous", &self.previous)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Pager {
    pub fn new(template_timeout: Duration) -> Self {
        Self {
            pages: HashMap::new(),
            param_pages: HashMap::new(),
            main_page: None,
            current: signal(None),
            previous: None,
            history: HashHistory::new(),
            state: PagerState::Idle,
            generation: 0,
            title: None,
            events: Vec::new(),
            template_timeout,
        }
    }

    pub fn page(&self, name: &str) -> Option<&NodeId> {
        self.pages.get(name)
    }

    /// Materialized page for a `name + params` key.
    pub fn page_for_key(&self, key: &str) -> Option<&NodeId> {
        self.param_pages.get(key)
    }

    pub fn main_page(&self) -> Option<&str> {
        self.main_page.as_deref()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current.get()
    }

    /// Reactive handle on the current page identity.
    pub fn current_signal(&self) -> Signal<Option<NodeId>> {
        self.current.clone()
    }

    pub fn previous(&self) -> Option<&NodeId> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> &PagerState {
        &self.state
    }

    pub fn history(&self) -> &HashHistory {
        &self.history
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn events(&self) -> &[PagerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<PagerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fail a template wait that has outlived the timeout.
    ///
    /// Returns true if a wait was expired. Its continuation becomes stale.
    pub fn expire(&mut self, now: Instant) -> bool {
        let PagerState::AwaitingTemplateData { path, since, .. } = &self.state else {
            return false;
        };
        if now.saturating_duration_since(*since) < self.template_timeout {
            return false;
        }
        let path = path.clone();
        warn!(%path, "template data timed out");
        self.generation += 1;
        self.events.push(PagerEvent::TemplateLoadTimedOut { path });
        self.state = PagerState::Idle;
        true
    }

    /// Drop every registration pointing at one of `ids`.
    pub fn forget(&mut self, ids: &[NodeId]) {
        if ids.is_empty() {
            return;
        }
        self.pages.retain(|_, id| !ids.contains(id));
        self.param_pages.retain(|_, id| !ids.contains(id));
        if self.current.get().is_some_and(|c| ids.contains(&c)) {
            self.current.set(None);
        }
        if self.previous.as_ref().is_some_and(|p| ids.contains(p)) {
            self.previous = None;
        }
    }

    fn is_waiting_for(&self, generation: u64) -> bool {
        matches!(
            &self.state,
            PagerState::AwaitingTemplateData { generation: g, .. } if *g == generation
        )
    }

    fn unresolved(&mut self, path: &str) {
        warn!(path, "no page matches route");
        self.events.push(PagerEvent::Unresolved {
            path: path.to_string(),
        });
        self.state = PagerState::Idle;
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Register a page node under its page name. The first page registered
/// becomes the main page.
pub fn add_page(engine: &mut Engine, id: &str) -> Result<()> {
    let node = engine
        .registry
        .object(id)
        .ok_or_else(|| EngineError::UnknownIdentity(id.to_string()))?;
    let name = node
        .page
        .as_ref()
        .ok_or_else(|| EngineError::NotAPage(id.to_string()))?
        .name
        .clone();

    debug!(%name, id, "page added");
    let pager = &mut engine.pager;
    if pager.main_page.is_none() {
        pager.main_page = Some(name.clone());
    }
    pager.pages.insert(name, id.to_string());
    Ok(())
}

/// Page shown for the bare `#/` route.
pub fn set_main_page(engine: &mut Engine, name: &str) -> Result<()> {
    if !engine.pager.pages.contains_key(name) {
        return Err(EngineError::NotAPage(name.to_string()));
    }
    engine.pager.main_page = Some(name.to_string());
    Ok(())
}

// =============================================================================
// Navigation
// =============================================================================

/// Handle a location-hash change.
pub fn navigate(engine: &mut Engine, hash: &str) -> Result<Direction> {
    let direction = engine.pager.history.record(hash);
    update_back_indicator(engine);
    show_path(engine, hash, direction)?;
    Ok(direction)
}

/// Show a page by name and parameters without touching the history.
pub fn show_page(engine: &mut Engine, name: &str, params: &Attrs) -> Result<()> {
    show_path(engine, &page_key(name, params), Direction::Forward)
}

fn update_back_indicator(engine: &mut Engine) {
    let indicator = engine.config.back_indicator.clone();
    if !engine.target.exists(&indicator) {
        return;
    }
    let visible = engine.pager.history.counter() != 0;
    if let Err(err) = engine.target.set_visible(&indicator, visible) {
        warn!(error = %err, "back indicator update failed");
    }
}

/// Resolve a path and show what it names.
fn show_path(engine: &mut Engine, path: &str, direction: Direction) -> Result<()> {
    engine.pager.state = PagerState::Resolving {
        path: path.to_string(),
    };

    let mut route = Route::parse(path);
    if route.name.is_empty() {
        match engine.pager.main_page.clone() {
            Some(main) => route = route.with_name(main),
            None => {
                engine.pager.unresolved(path);
                return Ok(());
            }
        }
    }

    if let Some(id) = engine.pager.param_pages.get(&route.key()).cloned() {
        if engine.registry.contains(&id) {
            return transition_to(engine, &id, direction);
        }
        engine.pager.forget(std::slice::from_ref(&id));
    }

    let Some(id) = engine.pager.pages.get(&route.name).cloned() else {
        engine.pager.unresolved(path);
        return Ok(());
    };
    let Some(node) = engine.registry.object_mut(&id) else {
        engine.pager.forget(std::slice::from_ref(&id));
        engine.pager.unresolved(path);
        return Ok(());
    };

    if node.template.is_some() {
        return await_template(engine, &id, route, path, direction);
    }
    if let Some(page) = node.page.as_mut() {
        page.params = route.params;
    }
    transition_to(engine, &id, direction)
}

/// Suspend until the template page host has a page for the route's params.
fn await_template(
    engine: &mut Engine,
    host: &str,
    route: Route,
    path: &str,
    direction: Direction,
) -> Result<()> {
    engine.pager.generation += 1;
    let generation = engine.pager.generation;
    engine.pager.state = PagerState::AwaitingTemplateData {
        path: path.to_string(),
        page: host.to_string(),
        generation,
        since: Instant::now(),
    };
    debug!(path, host, generation, "awaiting template data");

    let has_source = engine
        .registry
        .object(host)
        .and_then(|n| n.template.as_ref())
        .is_some_and(|b| b.source.is_some());
    let row = route.params_row();
    let ready = {
        let host = host.to_string();
        let path = path.to_string();
        let route = route.clone();
        move |engine: &mut Engine| on_template_page_ready(engine, generation, &host, &route, &path, direction)
    };

    if has_source {
        let options = LoadOptions {
            query: Some(row),
            seed: Some(route.params),
            on_finish: Some(Box::new(ready)),
            on_failure: Some(Box::new(move |engine: &mut Engine, reason: &str| {
                template_failed(engine, generation, reason)
            })),
            ..Default::default()
        };
        if let Err(err) = load(engine, host, options) {
            template_failed(engine, generation, &err.to_string());
            return Err(err);
        }
        return Ok(());
    }

    let options = DuplicateOptions {
        on_finish: Some(Box::new(ready)),
        ..Default::default()
    };
    if let Err(err) = duplicate_with_data(engine, host, row, options) {
        template_failed(engine, generation, &err.to_string());
        return Err(err);
    }
    Ok(())
}

fn on_template_page_ready(
    engine: &mut Engine,
    generation: u64,
    host: &str,
    route: &Route,
    path: &str,
    direction: Direction,
) {
    let key = route.key();
    let page = engine
        .pager
        .param_pages
        .get(&key)
        .cloned()
        .or_else(|| {
            engine
                .registry
                .object(host)
                .and_then(|n| n.template.as_ref())
                .and_then(|b| b.duplicate_ids.last().cloned())
        })
        .filter(|id| engine.registry.contains(id));

    // A page materialized after the pager moved on is still recorded, so
    // coming back to it later reuses it.
    if let Some(page) = &page {
        if let Some(meta) = engine.registry.object_mut(page).and_then(|n| n.page.as_mut()) {
            meta.params = route.params.clone();
        }
        engine.pager.param_pages.insert(key, page.clone());
    }

    if !engine.pager.is_waiting_for(generation) {
        debug!(path, generation, "stale template continuation");
        return;
    }
    if page.is_none() {
        template_failed(engine, generation, "template produced no page");
        return;
    }
    if let Err(err) = show_path(engine, path, direction) {
        warn!(path, error = %err, "showing template page failed");
    }
}

fn template_failed(engine: &mut Engine, generation: u64, reason: &str) {
    if !engine.pager.is_waiting_for(generation) {
        return;
    }
    let PagerState::AwaitingTemplateData { path, .. } = &engine.pager.state else {
        return;
    };
    let path = path.clone();
    warn!(%path, reason, "template page failed to load");
    engine.pager.events.push(PagerEvent::TemplateLoadFailed {
        path,
        reason: reason.to_string(),
    });
    engine.pager.state = PagerState::Idle;
}

/// Hide the current page and show `id`.
fn transition_to(engine: &mut Engine, id: &str, direction: Direction) -> Result<()> {
    let previous = engine.pager.current();
    if previous.as_deref() == Some(id) {
        debug!(id, "page already shown");
        engine.pager.state = PagerState::Idle;
        return Ok(());
    }

    if let Some(node) = engine.registry.object_mut(id) {
        node.style.remove("layer");
    }
    rebuild(engine, id, None)?;

    engine.pager.state = PagerState::Transitioning {
        from: previous.clone(),
        to: id.to_string(),
    };
    engine.pager.previous = previous.clone();
    engine.pager.current.set(Some(id.to_string()));

    let options = TransitionOptions {
        reverse: direction == Direction::Back,
        ..Default::default()
    };
    let leaving_template = previous
        .as_deref()
        .and_then(|p| engine.registry.object(p))
        .is_some_and(|n| n.is_template_backed());
    if let Some(prev) = previous.as_ref().filter(|_| !leaving_template) {
        let hide = Transition::new(prev.clone(), TransitionKind::Hide).with_options(options.clone());
        engine.run_transition(hide, None);
    }

    let kind = if previous.is_none() && !engine.config.animate_first_page {
        TransitionKind::QuickShow
    } else {
        TransitionKind::Show
    };
    let to = id.to_string();
    let show = Transition::new(id, kind).with_options(options);
    engine.run_transition(
        show,
        Some(Box::new(move |engine: &mut Engine| {
            finish_show(engine, &to, previous, leaving_template, direction)
        })),
    );
    Ok(())
}

/// `onShowComplete`: reload hook, title, then lower and hide a template page
/// being left.
fn finish_show(
    engine: &mut Engine,
    id: &str,
    previous: Option<NodeId>,
    leaving_template: bool,
    direction: Direction,
) {
    let (params, title) = match engine.registry.object(id).and_then(|n| n.page.as_ref()) {
        Some(page) => (Value::Object(page.params.clone()), page.title.clone()),
        None => (Value::Null, None),
    };

    if let Err(err) = engine.dispatch(id, "reload", params) {
        warn!(id, error = %err, "reload hook failed");
    }
    if let Some(title) = title {
        engine.target.set_title(&title);
        engine.pager.title = Some(title);
    }

    if let Some(prev) = previous.as_ref().filter(|_| leaving_template) {
        if let Some(node) = engine.registry.object_mut(prev) {
            node.set_style("layer", "lowered");
        }
        if let Err(err) = rebuild(engine, prev, None) {
            warn!(id = %prev, error = %err, "lowering previous page failed");
        }
        let options = TransitionOptions {
            reverse: direction == Direction::Back,
            ..Default::default()
        };
        engine.run_transition(
            Transition::new(prev.clone(), TransitionKind::Hide).with_options(options),
            None,
        );
    }

    if matches!(&engine.pager.state, PagerState::Transitioning { to, .. } if to == id) {
        engine.pager.state = PagerState::Idle;
    }
    debug!(from = ?previous, to = id, "navigated");
    engine.pager.events.push(PagerEvent::Navigated {
        from: previous,
        to: id.to_string(),
    });
}
