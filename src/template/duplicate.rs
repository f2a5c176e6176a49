//! Template duplication - one abstract subtree × N data rows → N live subtrees.
//!
//! # Algorithm (per row at position `k`)
//!
//! 1. Clone the host's row-container descriptor and merge the row's data on
//!    top. List rows are forced to inline display.
//! 2. Materialize the row container through the registry and wire its click
//!    dispatcher: the caller's per-row handler at `k` (if any) runs first,
//!    then the host's shared `choose` handler.
//! 3. Duplicate every abstract sub-object of the template with the row's
//!    data and append it to the row container.
//! 4. Record the container in `duplicate_ids` and `row_to_duplicate`.
//!
//! A reset removes every previous duplicate and clears the tracking lists
//! before the first new row is processed. After all rows, the duplicates are
//! attached in order and, unless suppressed, rebuilt.
//!
//! # Example
//!
//! ```ignore
//! use trellis::template::{duplicate_with_data, DuplicateOptions};
//!
//! let rows = json!([{ "name": "apple" }, { "name": "pear" }]);
//! let ids = duplicate_with_data(&mut engine, "fruits", rows, DuplicateOptions::reset())?;
//! assert_eq!(ids.len(), 2);
//! ```

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};

use super::binding::Attach;
use crate::context::{Continuation, Engine};
use crate::engine::{overlay, Behavior, Event, Handler, Overrides};
use crate::error::{EngineError, Result};
use crate::pipeline::rebuild;
use crate::types::{Attrs, NodeId};

/// Options of [`duplicate_with_data`].
#[derive(Default)]
pub struct DuplicateOptions {
    /// Runs once the duplicates are attached (and rebuilt, unless prevented).
    pub on_finish: Option<Continuation>,
    /// Remove all previous duplicates first.
    pub reset: bool,
    /// Attach without rebuilding.
    pub prevent_rebuild: bool,
    /// Per-row click handlers, by row position. Missing entries are no-ops.
    pub row_handlers: Vec<Option<Handler>>,
}

impl DuplicateOptions {
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Default::default()
        }
    }

    pub fn on_finish(mut self, f: impl FnOnce(&mut Engine) + 'static) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn prevent_rebuild(mut self) -> Self {
        self.prevent_rebuild = true;
        self
    }

    pub fn row_handlers(mut self, handlers: Vec<Option<Handler>>) -> Self {
        self.row_handlers = handlers;
        self
    }
}

/// A single row becomes a one-element sequence; `null` means no rows.
pub fn normalize_rows(data: Value) -> Vec<Value> {
    match data {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        row => vec![row],
    }
}

/// Row data as an override map. Non-object rows are exposed as `value`.
pub(crate) fn row_attrs(row: &Value) -> Attrs {
    match row {
        Value::Object(map) => map.clone(),
        other => {
            let mut attrs = Attrs::new();
            attrs.insert("value".to_string(), other.clone());
            attrs
        }
    }
}

/// Expand `data` into duplicates of the host's template.
///
/// Returns the identities of the new row containers, in row order.
pub fn duplicate_with_data(
    engine: &mut Engine,
    host: &str,
    data: Value,
    options: DuplicateOptions,
) -> Result<Vec<NodeId>> {
    let host_node = engine
        .registry
        .object(host)
        .ok_or_else(|| EngineError::UnknownIdentity(host.to_string()))?;
    let binding = host_node
        .template
        .as_ref()
        .ok_or_else(|| EngineError::NotATemplate(host.to_string()))?;
    let row_descriptor = binding.row.clone();
    let abstract_ids = binding.abstract_ids.clone();
    let attach = binding.attach;
    let host_page = host_node.page.clone();
    let attach_parent = match attach {
        Attach::Host => Some(host.to_string()),
        Attach::HostParent => host_node.parent.clone(),
    };

    if options.reset {
        reset(engine, host)?;
    }

    let rows = normalize_rows(data);
    let start = engine
        .registry
        .object(host)
        .and_then(|n| n.template.as_ref())
        .map_or(0, |b| b.duplicate_ids.len());
    let mut created = Vec::with_capacity(rows.len());

    for (k, row) in rows.into_iter().enumerate() {
        let data = row_attrs(&row);
        let mut descriptor = row_descriptor.clone();
        descriptor.id = None;
        descriptor.kind.get_or_insert_with(|| "container".to_string());
        overlay(&mut descriptor.data, &data);
        if attach == Attach::Host {
            descriptor
                .style
                .insert("display".to_string(), Value::String("inline".to_string()));
        }

        let row_id = engine
            .registry
            .create_from_descriptor(&engine.catalog, &engine.config, &descriptor)?;

        if let Some(node) = engine.registry.object_mut(&row_id) {
            match attach {
                Attach::Host => {
                    let row_handler = options.row_handlers.get(k).cloned().flatten();
                    node.behavior.insert(
                        "click".to_string(),
                        row_dispatcher(host, k, start + k, row.clone(), row_handler),
                    );
                }
                Attach::HostParent => {
                    if let (Some(page), Some(host_page)) = (node.page.as_mut(), &host_page) {
                        page.name = host_page.name.clone();
                        page.title = page.title.take().or_else(|| host_page.title.clone());
                        page.origin = Some(host.to_string());
                    }
                }
            }
        }

        let overrides = Overrides {
            data,
            ..Default::default()
        };
        for object in &abstract_ids {
            let copy = engine.registry.duplicate(object, &overrides)?;
            engine.registry.append_child(&row_id, &copy)?;
        }

        if let Some(binding) = engine.registry.object_mut(host).and_then(|n| n.template.as_mut()) {
            binding.duplicate_ids.push(row_id.clone());
            binding.data_rows.push(row.clone());
            binding.row_to_duplicate.insert(row_id.clone(), row);
        }
        created.push(row_id);
    }

    if let Some(parent) = &attach_parent {
        for id in &created {
            engine.registry.append_child(parent, id)?;
        }
    }
    debug!(host, rows = created.len(), "duplicated");

    if !options.prevent_rebuild {
        rebuild_attached(engine, host, attach, attach_parent.as_deref(), &created)?;
    }
    if let Some(on_finish) = options.on_finish {
        on_finish(engine);
    }
    Ok(created)
}

/// Rebuild whatever can be committed: the host for list rows, each new page
/// for page duplicates. Nothing is built while the attach point has no
/// element; the duplicates render with it later.
fn rebuild_attached(
    engine: &mut Engine,
    host: &str,
    attach: Attach,
    parent: Option<&str>,
    created: &[NodeId],
) -> Result<()> {
    match attach {
        Attach::Host if engine.target.exists(host) => rebuild(engine, host, None),
        Attach::HostParent if parent.is_some_and(|p| engine.target.exists(p)) => {
            for id in created {
                rebuild(engine, id, None)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Two-stage click dispatcher of one row container.
fn row_dispatcher(
    host: &str,
    local: usize,
    index: usize,
    row: Value,
    row_handler: Option<Handler>,
) -> Behavior {
    let host = host.to_string();
    Behavior::Handler(Rc::new(move |engine: &mut Engine, event: &Event| {
        if let Some(handler) = &row_handler {
            let own = Event {
                target: event.target.clone(),
                name: event.name.clone(),
                index: Some(local),
                value: row.clone(),
            };
            handler(engine, &own);
        }
        let choose = engine
            .object(&host)
            .and_then(|n| n.behavior.get("choose"))
            .and_then(Behavior::as_handler)
            .cloned();
        if let Some(choose) = choose {
            let chosen = Event {
                target: host.clone(),
                name: "choose".to_string(),
                index: Some(index),
                value: row.clone(),
            };
            choose(engine, &chosen);
        }
    }))
}

/// Remove every duplicate of a host and clear its tracking lists.
///
/// Duplicates with an element are removed from the render target too; the
/// rest are dropped from the registry only.
pub fn reset(engine: &mut Engine, host: &str) -> Result<Vec<NodeId>> {
    let previous = engine
        .registry
        .object_mut(host)
        .ok_or_else(|| EngineError::UnknownIdentity(host.to_string()))?
        .template
        .as_mut()
        .ok_or_else(|| EngineError::NotATemplate(host.to_string()))?
        .clear_duplicates();

    let mut removed = Vec::new();
    for id in &previous {
        if !engine.registry.contains(id) {
            continue;
        }
        let gone = if engine.target.exists(id) {
            match engine.registry.remove(id, engine.target.as_mut()) {
                Ok(gone) => gone,
                Err(err) => {
                    warn!(host, %id, error = %err, "failed to remove duplicate");
                    engine.registry.discard(id)
                }
            }
        } else {
            engine.registry.discard(id)
        };
        removed.extend(gone);
    }
    engine.pager.forget(&removed);
    debug!(host, removed = previous.len(), "reset");
    Ok(removed)
}
