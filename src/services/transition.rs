//! Transition runner - show/hide effects.
//!
//! The engine asks a [`TransitionRunner`] to animate a visibility change and
//! hands it a [`Ticket`]. A runner that finishes on the spot answers
//! [`Progress::Done`]; one that animates over time answers
//! [`Progress::Pending`] and later reports through
//! `Engine::finish_transition(ticket)`. Either way the completion the engine
//! attached to the ticket runs exactly once.
//!
//! # Example
//!
//! ```ignore
//! let transitions = RecordingTransitions::deferred();
//! let mut engine = Engine::builder().transitions(transitions.clone()).build();
//!
//! engine.navigate("#/about")?;
//! for ticket in transitions.take_pending() {
//!     engine.finish_transition(ticket)?;
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::{NodeId, Ticket};

// =============================================================================
// Transition Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Show,
    Hide,
    /// Show without an effect.
    QuickShow,
    /// Hide without an effect.
    QuickHide,
}

impl TransitionKind {
    pub fn is_show(self) -> bool {
        matches!(self, Self::Show | Self::QuickShow)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionOptions {
    /// Named effect (`fade`, `slide`, ...). Runner default when `None`.
    pub effect: Option<String>,
    pub duration_ms: Option<u64>,
    /// Play the effect backwards, used for back navigation.
    pub reverse: bool,
}

/// One requested visibility change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: NodeId,
    pub kind: TransitionKind,
    pub options: TransitionOptions,
}

impl Transition {
    pub fn new(target: impl Into<NodeId>, kind: TransitionKind) -> Self {
        Self {
            target: target.into(),
            kind,
            options: TransitionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransitionOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Finished synchronously; the engine completes the ticket itself.
    Done,
    /// The runner keeps the ticket and reports back later.
    Pending,
}

/// Transition-runner collaborator.
pub trait TransitionRunner {
    fn run(&mut self, transition: &Transition, ticket: Ticket) -> Progress;
}

// =============================================================================
// Recording Runner
// =============================================================================

#[derive(Debug, Default)]
struct Recording {
    defer: bool,
    history: Vec<Transition>,
    pending: Vec<Ticket>,
}

/// Headless runner that records every transition.
///
/// Immediate mode finishes everything synchronously. Deferred mode keeps the
/// tickets of animated `Show`/`Hide` transitions for the caller to finish;
/// quick transitions always finish synchronously.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransitions {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingTransitions {
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn deferred() -> Self {
        let runner = Self::default();
        runner.set_deferred(true);
        runner
    }

    pub fn set_deferred(&self, defer: bool) {
        self.inner.borrow_mut().defer = defer;
    }

    pub fn history(&self) -> Vec<Transition> {
        self.inner.borrow().history.clone()
    }

    /// Recorded transitions of one kind, in order.
    pub fn of_kind(&self, kind: TransitionKind) -> Vec<NodeId> {
        self.inner
            .borrow()
            .history
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.target.clone())
            .collect()
    }

    pub fn pending_tickets(&self) -> Vec<Ticket> {
        self.inner.borrow().pending.clone()
    }

    pub fn take_pending(&self) -> Vec<Ticket> {
        std::mem::take(&mut self.inner.borrow_mut().pending)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.history.clear();
        inner.pending.clear();
    }
}

impl TransitionRunner for RecordingTransitions {
    fn run(&mut self, transition: &Transition, ticket: Ticket) -> Progress {
        let mut inner = self.inner.borrow_mut();
        inner.history.push(transition.clone());
        let animated = matches!(transition.kind, TransitionKind::Show | TransitionKind::Hide);
        if inner.defer && animated {
            inner.pending.push(ticket);
            Progress::Pending
        } else {
            Progress::Done
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_records() {
        let recorder = RecordingTransitions::immediate();
        let mut runner = recorder.clone();
        let progress = runner.run(&Transition::new("p", TransitionKind::Show), Ticket(1));
        assert_eq!(progress, Progress::Done);
        assert_eq!(recorder.of_kind(TransitionKind::Show), ["p"]);
        assert!(recorder.pending_tickets().is_empty());
    }

    #[test]
    fn test_deferred_keeps_animated_tickets() {
        let recorder = RecordingTransitions::deferred();
        let mut runner = recorder.clone();
        assert_eq!(
            runner.run(&Transition::new("a", TransitionKind::Hide), Ticket(1)),
            Progress::Pending
        );
        assert_eq!(
            runner.run(&Transition::new("l", TransitionKind::QuickShow), Ticket(2)),
            Progress::Done
        );
        assert_eq!(recorder.take_pending(), [Ticket(1)]);
        assert!(recorder.pending_tickets().is_empty());
        assert_eq!(recorder.history().len(), 2);
    }
}
