//! Render commit - applies a build pass to the render target.
//!
//! Inserts the produced fragments, then walks the prepared set: every touched
//! node that now has an element is marked materialized, and nodes that ask
//! for it get their enter animation exactly once.

use tracing::debug;

use super::build::{prepare_build, Fragment};
use crate::context::{Continuation, Engine};
use crate::error::{EngineError, Result};
use crate::services::{Transition, TransitionKind};
use crate::types::{Lifecycle, DOCUMENT_ROOT};

/// Insert fragments and settle lifecycle flags of the prepared set.
///
/// The prepared set is drained even when an insertion fails, so a failed
/// commit never leaks touched nodes into the next pass.
pub fn commit(engine: &mut Engine, fragments: Vec<Fragment>) -> Result<()> {
    let inserted = fragments
        .iter()
        .try_for_each(|f| engine.target.insert(&f.parent, &f.markup));

    let mut entering = Vec::new();
    for id in engine.registry.take_prepared() {
        let exists = engine.target.exists(&id);
        let Some(node) = engine.registry.object_mut(&id) else { continue };
        node.flags.set(Lifecycle::MATERIALIZED, exists);
        if exists && !node.flags.contains(Lifecycle::ENTERED) && node.flag("animate_enter") {
            node.flags.insert(Lifecycle::ENTERED);
            entering.push(id);
        }
    }

    for id in entering {
        engine.run_transition(Transition::new(id, TransitionKind::Show), None);
    }
    inserted
}

/// Build and commit a node's subtree, then run `on_finish`.
///
/// A node without an element needs an existing parent element to be
/// inserted under; otherwise nothing is touched and the parent is reported
/// missing.
pub fn rebuild(engine: &mut Engine, id: &str, on_finish: Option<Continuation>) -> Result<()> {
    let node = engine
        .registry
        .object(id)
        .ok_or_else(|| EngineError::UnknownIdentity(id.to_string()))?;
    if !engine.target.exists(id) {
        let parent = node.parent.as_deref().unwrap_or(DOCUMENT_ROOT);
        if !engine.target.exists(parent) {
            return Err(EngineError::ElementMissing(parent.to_string()));
        }
    }

    let fragments = prepare_build(engine, id)?;
    debug!(id, fragments = fragments.len(), "rebuild");
    commit(engine, fragments)?;

    if let Some(on_finish) = on_finish {
        on_finish(engine);
    }
    Ok(())
}
